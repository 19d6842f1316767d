//! Conversation state machine.
//!
//! Dispatches (session state, inbound event) pairs to handlers that
//! consult the user store and subscription gate and answer with
//! outbound actions plus a state transition. One explicit `App`
//! context owns every collaborator; there is no ambient global state.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::audit;
use crate::broadcast::BroadcastEngine;
use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::events::{CallbackAction, Command, InboundEvent, Messenger, OutboundAction, UserId};
use crate::gate::{MembershipApi, MembershipStatus, SubscriptionGate};
use crate::menu::{self, MenuSection};
use crate::session::{SessionMap, SessionState};
use crate::store::UserStore;
use crate::texts;

/// Application context, constructed once at startup and shared by
/// every handler invocation.
pub struct App {
    config: BotConfig,
    store: Arc<dyn UserStore>,
    messenger: Arc<dyn Messenger>,
    gate: SubscriptionGate,
    broadcast: BroadcastEngine,
    sessions: SessionMap,
}

impl App {
    pub fn new(
        config: BotConfig,
        store: Arc<dyn UserStore>,
        messenger: Arc<dyn Messenger>,
        membership: Arc<dyn MembershipApi>,
    ) -> Self {
        let gate = SubscriptionGate::new(membership, config.channel_id.clone());
        let broadcast = BroadcastEngine::new(
            Arc::clone(&store),
            Arc::clone(&messenger),
            config.broadcast_concurrency,
        );
        Self {
            config,
            store,
            messenger,
            gate,
            broadcast,
            sessions: SessionMap::new(),
        }
    }

    /// Session state access for diagnostics and tests.
    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    /// Per-event entry point and error boundary.
    ///
    /// Holds the sender's session lock for the full read-decide-write,
    /// releases it before the outbound sends, and never lets one
    /// user's failure escape to the caller.
    pub async fn handle_event(&self, event: InboundEvent) {
        let sender = event.sender();
        let kind = event.kind();

        let actions = {
            let mut slot = self.sessions.acquire(sender).await;
            match self.dispatch(&mut slot, &event).await {
                Ok(actions) => actions,
                Err(Error::Storage(e)) => {
                    warn!(user_id = sender, error = %e, "store unavailable while handling event");
                    vec![OutboundAction::text(sender, texts::TRY_AGAIN)]
                }
                Err(e) => {
                    error!(user_id = sender, event = kind, error = %e, "event handling failed");
                    vec![OutboundAction::text(sender, texts::FALLBACK)]
                }
            }
        };

        for action in actions {
            self.deliver(action).await;
        }
    }

    async fn deliver(&self, action: OutboundAction) {
        let result = match &action {
            OutboundAction::SendText {
                recipient,
                text,
                keyboard,
            } => {
                self.messenger
                    .send_text(*recipient, text, keyboard.as_ref())
                    .await
            }
            OutboundAction::AnswerCallback { callback_id } => {
                self.messenger.answer_callback(callback_id).await
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "outbound delivery failed");
        }
    }

    async fn dispatch(
        &self,
        state: &mut Option<SessionState>,
        event: &InboundEvent,
    ) -> Result<Vec<OutboundAction>> {
        match event {
            InboundEvent::Command { sender, command } => {
                self.handle_command(state, *sender, *command).await
            }
            InboundEvent::Text { sender, text } => self.handle_text(state, *sender, text).await,
            InboundEvent::ContactShared { sender, phone } => {
                self.handle_contact(state, *sender, phone).await
            }
            InboundEvent::Callback {
                sender,
                callback_id,
                action,
            } => self.handle_callback(state, *sender, callback_id, action).await,
        }
    }

    fn is_admin(&self, sender: UserId) -> bool {
        sender == self.config.admin_id
    }

    // ── Commands ────────────────────────────────────────────────────

    async fn handle_command(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        command: Command,
    ) -> Result<Vec<OutboundAction>> {
        match command {
            Command::Start => {
                audit::log_action(sender, "started the bot");
                self.start_flow(state, sender).await
            }
            Command::Help => {
                audit::log_action(sender, "asked for help");
                Ok(vec![OutboundAction::text(sender, texts::HELP)])
            }
            Command::Menu => {
                audit::log_action(sender, "opened the menu");
                *state = Some(SessionState::Menu);
                Ok(vec![OutboundAction::text_with_keyboard(
                    sender,
                    texts::CHOOSE_SECTION,
                    menu::main_menu_keyboard(),
                )])
            }
            Command::Users => {
                if !self.is_admin(sender) {
                    audit::log_denied(sender, "users");
                    return Ok(vec![OutboundAction::text(sender, texts::ACCESS_DENIED)]);
                }
                audit::log_action(sender, "listed users");
                let users = self.store.list_users().await?;
                if users.is_empty() {
                    return Ok(vec![OutboundAction::text(sender, texts::NO_USERS)]);
                }
                let lines: Vec<String> = users
                    .iter()
                    .map(|u| {
                        format!("ID: {}, phone: {}", u.id, u.phone.as_deref().unwrap_or("-"))
                    })
                    .collect();
                Ok(vec![OutboundAction::text(
                    sender,
                    format!("Known users:\n{}", lines.join("\n")),
                )])
            }
            Command::Broadcast => {
                if !self.is_admin(sender) {
                    audit::log_denied(sender, "broadcast");
                    return Ok(vec![OutboundAction::text(sender, texts::ACCESS_DENIED)]);
                }
                audit::log_action(sender, "started authoring a broadcast");
                *state = Some(SessionState::BroadcastAuthoring);
                Ok(vec![OutboundAction::text(sender, texts::BROADCAST_PROMPT)])
            }
        }
    }

    /// The start-command logic, shared with the restart button.
    async fn start_flow(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
    ) -> Result<Vec<OutboundAction>> {
        let first_done = self.store.is_first_interaction_done(sender).await?;
        let has_phone = self.store.has_phone(sender).await?;

        if first_done && has_phone {
            *state = Some(SessionState::Menu);
            Ok(vec![OutboundAction::text_with_keyboard(
                sender,
                texts::WELCOME_BACK,
                menu::main_menu_keyboard(),
            )])
        } else {
            *state = Some(SessionState::Welcome);
            Ok(vec![OutboundAction::text_with_keyboard(
                sender,
                texts::WELCOME,
                menu::welcome_keyboard(),
            )])
        }
    }

    // ── Free text ───────────────────────────────────────────────────

    async fn handle_text(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        text: &str,
    ) -> Result<Vec<OutboundAction>> {
        // Restart works from any state: clear the session and re-run
        // the start logic.
        if text == menu::RESTART_LABEL {
            audit::log_action(sender, "restarted");
            *state = None;
            return self.start_flow(state, sender).await;
        }

        match *state {
            Some(SessionState::Welcome) => self.handle_welcome_text(state, sender, text).await,
            Some(SessionState::Menu) => self.handle_menu_text(sender, text).await,
            Some(SessionState::BroadcastAuthoring) => {
                self.run_broadcast(state, sender, text).await
            }
            Some(SessionState::AwaitingPhone) | None => {
                Ok(vec![OutboundAction::text(sender, texts::UNRECOGNIZED)])
            }
        }
    }

    async fn handle_welcome_text(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        text: &str,
    ) -> Result<Vec<OutboundAction>> {
        match text {
            menu::BEGIN_LABEL => {
                audit::log_action(sender, "pressed begin");
                self.store.mark_first_interaction_done(sender).await?;

                if self.store.has_phone(sender).await? {
                    *state = Some(SessionState::Menu);
                    Ok(vec![OutboundAction::text_with_keyboard(
                        sender,
                        texts::CHOOSE_SECTION,
                        menu::main_menu_keyboard(),
                    )])
                } else {
                    *state = Some(SessionState::AwaitingPhone);
                    Ok(vec![OutboundAction::text_with_keyboard(
                        sender,
                        texts::REQUEST_PHONE,
                        menu::share_phone_keyboard(),
                    )])
                }
            }
            menu::HELP_LABEL => {
                audit::log_action(sender, "asked for help");
                Ok(vec![OutboundAction::text(sender, texts::HELP)])
            }
            _ => Ok(vec![OutboundAction::text(sender, texts::UNRECOGNIZED)]),
        }
    }

    async fn handle_menu_text(&self, sender: UserId, text: &str) -> Result<Vec<OutboundAction>> {
        let Some(section) = MenuSection::from_label(text) else {
            return Ok(vec![OutboundAction::text(sender, texts::INVALID_CHOICE)]);
        };

        audit::log_action(sender, &format!("picked section: {}", section.label()));
        Ok(vec![self.gated_section_reply(sender, section).await])
    }

    /// The three-way gate outcome for a section request. The session
    /// stays in `Menu` for all of them.
    async fn gated_section_reply(&self, sender: UserId, section: MenuSection) -> OutboundAction {
        match self.gate.check(sender).await {
            MembershipStatus::Member => OutboundAction::text_with_keyboard(
                sender,
                texts::CHOOSE_OPTION,
                section.keyboard(),
            ),
            MembershipStatus::NonMember => OutboundAction::text_with_keyboard(
                sender,
                texts::subscribe_required(&self.config.channel_name),
                menu::subscribe_keyboard(&self.config.channel_id, &self.config.channel_name),
            ),
            MembershipStatus::Indeterminate(reason) => {
                debug!(user_id = sender, reason, "gate indeterminate for section request");
                OutboundAction::text(sender, texts::VERIFY_FAILED)
            }
        }
    }

    async fn run_broadcast(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        text: &str,
    ) -> Result<Vec<OutboundAction>> {
        audit::log_action(sender, "ran a broadcast");
        let result = self.broadcast.broadcast(text).await?;
        *state = Some(SessionState::Menu);

        if result.attempted == 0 {
            return Ok(vec![OutboundAction::text(sender, texts::BROADCAST_EMPTY)]);
        }
        Ok(vec![OutboundAction::text(
            sender,
            texts::broadcast_summary(&result),
        )])
    }

    // ── Contact share ───────────────────────────────────────────────

    async fn handle_contact(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        phone: &str,
    ) -> Result<Vec<OutboundAction>> {
        if *state != Some(SessionState::AwaitingPhone) {
            return Ok(vec![OutboundAction::text(sender, texts::UNRECOGNIZED)]);
        }

        audit::log_action(sender, "shared a phone number");
        self.store.upsert_user(sender, Some(phone)).await?;
        *state = Some(SessionState::Menu);
        Ok(vec![OutboundAction::text_with_keyboard(
            sender,
            texts::PHONE_SAVED,
            menu::main_menu_keyboard(),
        )])
    }

    // ── Callbacks ───────────────────────────────────────────────────

    async fn handle_callback(
        &self,
        state: &mut Option<SessionState>,
        sender: UserId,
        callback_id: &str,
        action: &CallbackAction,
    ) -> Result<Vec<OutboundAction>> {
        // Always acknowledge first so the client spinner stops even
        // when the action itself goes nowhere.
        let mut actions = vec![OutboundAction::AnswerCallback {
            callback_id: callback_id.to_string(),
        }];

        match action {
            CallbackAction::CheckSubscription => {
                audit::log_action(sender, "confirmed subscription");
                *state = Some(SessionState::Menu);
                match self.gate.check(sender).await {
                    MembershipStatus::Member => actions.push(OutboundAction::text_with_keyboard(
                        sender,
                        texts::SUBSCRIPTION_CONFIRMED,
                        menu::main_menu_keyboard(),
                    )),
                    MembershipStatus::NonMember => {
                        actions.push(OutboundAction::text_with_keyboard(
                            sender,
                            texts::subscribe_required(&self.config.channel_name),
                            menu::subscribe_keyboard(
                                &self.config.channel_id,
                                &self.config.channel_name,
                            ),
                        ))
                    }
                    MembershipStatus::Indeterminate(reason) => {
                        debug!(user_id = sender, reason, "gate indeterminate on re-check");
                        actions.push(OutboundAction::text(sender, texts::VERIFY_FAILED));
                    }
                }
            }
            CallbackAction::BackToMenu => {
                audit::log_action(sender, "returned to the menu");
                *state = Some(SessionState::Menu);
                actions.push(OutboundAction::text_with_keyboard(
                    sender,
                    texts::CHOOSE_SECTION,
                    menu::main_menu_keyboard(),
                ));
            }
            CallbackAction::CreditCards => {
                audit::log_action(sender, "drilled into credit cards");
                actions.push(OutboundAction::text(sender, texts::CREDIT_CARDS_NOTE));
            }
            CallbackAction::Unknown(data) => {
                warn!(user_id = sender, data, "unknown callback action");
            }
        }

        Ok(actions)
    }
}
