//! End-to-end conversation flow tests: real state machine, real
//! in-memory store, fake platform capabilities.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use offerbot::config::BotConfig;
use offerbot::error::{DeliveryError, MembershipError};
use offerbot::events::{
    CallbackAction, Command, InboundEvent, KeyboardSpec, Messenger, UserId,
};
use offerbot::flow::App;
use offerbot::gate::MembershipApi;
use offerbot::menu;
use offerbot::session::SessionState;
use offerbot::store::{LibSqlUserStore, UserStore};
use offerbot::texts;

const ADMIN: UserId = 900;
const USER: UserId = 1;

// ── Test doubles ────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(UserId, String, bool)>>,
    fail_for: Mutex<HashSet<UserId>>,
}

impl RecordingMessenger {
    fn fail_for(&self, ids: impl IntoIterator<Item = UserId>) {
        self.fail_for.lock().unwrap().extend(ids);
    }

    fn last_text_to(&self, recipient: UserId) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| *to == recipient)
            .map(|(_, text, _)| text.clone())
    }

    fn last_had_keyboard(&self, recipient: UserId) -> bool {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| *to == recipient)
            .map(|(_, _, kb)| *kb)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), DeliveryError> {
        if self.fail_for.lock().unwrap().contains(&recipient) {
            return Err(DeliveryError::SendFailed {
                recipient,
                reason: "blocked by recipient".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient, text.to_string(), keyboard.is_some()));
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Membership capability whose answer can be switched between calls.
struct SwitchableGate {
    answer: Mutex<Result<String, String>>,
}

impl SwitchableGate {
    fn member() -> Self {
        Self {
            answer: Mutex::new(Ok("member".into())),
        }
    }

    fn set(&self, answer: Result<&str, &str>) {
        *self.answer.lock().unwrap() = answer.map(str::to_string).map_err(str::to_string);
    }
}

#[async_trait]
impl MembershipApi for SwitchableGate {
    async fn member_role(
        &self,
        _chat_id: &str,
        _user_id: UserId,
    ) -> Result<String, MembershipError> {
        self.answer
            .lock()
            .unwrap()
            .clone()
            .map_err(MembershipError::RequestFailed)
    }
}

// ── Harness ─────────────────────────────────────────────────────────

fn config() -> BotConfig {
    BotConfig {
        bot_token: SecretString::from("test-token"),
        channel_id: "-1001234".into(),
        channel_name: "Deals Galaxy".into(),
        admin_id: ADMIN,
        webhook_url: None,
        webhook_path: "/webhook".into(),
        port: 0,
        db_path: ":memory:".into(),
        log_file: "test.log".into(),
        broadcast_concurrency: 4,
    }
}

async fn build_app() -> (
    Arc<App>,
    Arc<RecordingMessenger>,
    Arc<LibSqlUserStore>,
    Arc<SwitchableGate>,
) {
    let store = Arc::new(LibSqlUserStore::new_memory().await.unwrap());
    let messenger = Arc::new(RecordingMessenger::default());
    let gate = Arc::new(SwitchableGate::member());
    let app = Arc::new(App::new(
        config(),
        Arc::clone(&store) as Arc<dyn UserStore>,
        Arc::clone(&messenger) as Arc<dyn Messenger>,
        Arc::clone(&gate) as Arc<dyn MembershipApi>,
    ));
    (app, messenger, store, gate)
}

async fn send_text(app: &App, sender: UserId, text: &str) {
    app.handle_event(InboundEvent::Text {
        sender,
        text: text.into(),
    })
    .await;
}

async fn send_command(app: &App, sender: UserId, command: Command) {
    app.handle_event(InboundEvent::Command { sender, command })
        .await;
}

// ── Onboarding journey ──────────────────────────────────────────────

#[tokio::test]
async fn full_onboarding_journey() {
    let (app, messenger, store, _gate) = build_app().await;

    send_command(&app, USER, Command::Start).await;
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Welcome));

    send_text(&app, USER, menu::BEGIN_LABEL).await;
    assert_eq!(
        app.sessions().peek(USER).await,
        Some(SessionState::AwaitingPhone)
    );
    assert!(store.is_first_interaction_done(USER).await.unwrap());

    app.handle_event(InboundEvent::ContactShared {
        sender: USER,
        phone: "+15550100".into(),
    })
    .await;
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Menu));
    assert!(store.has_phone(USER).await.unwrap());

    send_text(&app, USER, menu::MenuSection::CreditCards.label()).await;
    assert_eq!(
        messenger.last_text_to(USER).unwrap(),
        texts::CHOOSE_OPTION
    );
    assert!(messenger.last_had_keyboard(USER));
}

#[tokio::test]
async fn start_twice_without_phone_is_idempotent() {
    let (app, messenger, _store, _gate) = build_app().await;

    send_command(&app, USER, Command::Start).await;
    send_command(&app, USER, Command::Start).await;

    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Welcome));
    let welcomes = messenger
        .sent
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, text, _)| text == texts::WELCOME)
        .count();
    assert_eq!(welcomes, 2);
}

#[tokio::test]
async fn returning_user_with_phone_skips_onboarding() {
    let (app, messenger, store, _gate) = build_app().await;
    store.upsert_user(USER, Some("+15550100")).await.unwrap();
    store.mark_first_interaction_done(USER).await.unwrap();

    send_command(&app, USER, Command::Start).await;
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Menu));
    assert_eq!(messenger.last_text_to(USER).unwrap(), texts::WELCOME_BACK);
}

// ── Gate outcomes from identical state and input ────────────────────

#[tokio::test]
async fn identical_menu_input_differs_only_by_gate_outcome() {
    let (app, messenger, _store, gate) = build_app().await;
    send_command(&app, USER, Command::Menu).await;
    let label = menu::MenuSection::Insurance.label();

    gate.set(Ok("member"));
    send_text(&app, USER, label).await;
    assert_eq!(messenger.last_text_to(USER).unwrap(), texts::CHOOSE_OPTION);

    gate.set(Ok("left"));
    send_text(&app, USER, label).await;
    assert!(
        messenger
            .last_text_to(USER)
            .unwrap()
            .contains("subscribe")
    );

    gate.set(Err("network timeout"));
    send_text(&app, USER, label).await;
    assert_eq!(messenger.last_text_to(USER).unwrap(), texts::VERIFY_FAILED);

    // All three outcomes left the session in Menu.
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Menu));
}

#[tokio::test]
async fn subscription_recheck_callback_follows_gate() {
    let (app, messenger, _store, gate) = build_app().await;

    gate.set(Ok("left"));
    app.handle_event(InboundEvent::Callback {
        sender: USER,
        callback_id: "cb-1".into(),
        action: CallbackAction::CheckSubscription,
    })
    .await;
    assert!(
        messenger
            .last_text_to(USER)
            .unwrap()
            .contains("subscribe")
    );

    gate.set(Ok("member"));
    app.handle_event(InboundEvent::Callback {
        sender: USER,
        callback_id: "cb-2".into(),
        action: CallbackAction::CheckSubscription,
    })
    .await;
    assert_eq!(
        messenger.last_text_to(USER).unwrap(),
        texts::SUBSCRIPTION_CONFIRMED
    );
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Menu));
}

// ── Broadcast ───────────────────────────────────────────────────────

#[tokio::test]
async fn non_admin_never_reaches_broadcast_authoring() {
    let (app, messenger, _store, _gate) = build_app().await;

    send_command(&app, USER, Command::Broadcast).await;
    assert_eq!(messenger.last_text_to(USER).unwrap(), texts::ACCESS_DENIED);
    assert_ne!(
        app.sessions().peek(USER).await,
        Some(SessionState::BroadcastAuthoring)
    );
}

#[tokio::test]
async fn broadcast_counts_interspersed_failures() {
    let (app, messenger, store, _gate) = build_app().await;
    for id in 1..=7 {
        store
            .upsert_user(id, Some(&format!("+1555{id:04}")))
            .await
            .unwrap();
    }
    messenger.fail_for([2, 5]);

    send_command(&app, ADMIN, Command::Broadcast).await;
    assert_eq!(
        app.sessions().peek(ADMIN).await,
        Some(SessionState::BroadcastAuthoring)
    );

    send_text(&app, ADMIN, "flash sale").await;
    let summary = messenger.last_text_to(ADMIN).unwrap();
    assert!(summary.contains("Delivered: 5"), "summary: {summary}");
    assert!(summary.contains("Failed: 2"), "summary: {summary}");
    assert_eq!(app.sessions().peek(ADMIN).await, Some(SessionState::Menu));

    // Delivery reached everyone except the failing recipients.
    let delivered: HashSet<UserId> = messenger
        .sent
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, text, _)| text == "flash sale")
        .map(|(to, _, _)| *to)
        .collect();
    assert_eq!(delivered, HashSet::from([1, 3, 4, 6, 7]));
}

// ── Concurrency ─────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_contact_shares_persist_exactly_one_phone() {
    let (app, _messenger, store, _gate) = build_app().await;
    send_command(&app, USER, Command::Start).await;
    send_text(&app, USER, menu::BEGIN_LABEL).await;
    assert_eq!(
        app.sessions().peek(USER).await,
        Some(SessionState::AwaitingPhone)
    );

    // Duplicate webhook delivery: two contact shares race for the
    // same user. Per-user serialization means one wins and the other
    // is handled from the post-transition state.
    let first = {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            app.handle_event(InboundEvent::ContactShared {
                sender: USER,
                phone: "+15550111".into(),
            })
            .await;
        })
    };
    let second = {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            app.handle_event(InboundEvent::ContactShared {
                sender: USER,
                phone: "+15550222".into(),
            })
            .await;
        })
    };
    first.await.unwrap();
    second.await.unwrap();

    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    let phone = users[0].phone.clone().unwrap();
    assert!(
        phone == "+15550111" || phone == "+15550222",
        "unexpected phone: {phone}"
    );
    assert_eq!(app.sessions().peek(USER).await, Some(SessionState::Menu));
}

#[tokio::test]
async fn distinct_users_are_handled_independently() {
    let (app, _messenger, _store, _gate) = build_app().await;

    let mut handles = Vec::new();
    for id in 1..=10 {
        let app = Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            app.handle_event(InboundEvent::Command {
                sender: id,
                command: Command::Start,
            })
            .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for id in 1..=10 {
        assert_eq!(app.sessions().peek(id).await, Some(SessionState::Welcome));
    }
}
