//! User-facing copy.

use crate::broadcast::BroadcastResult;

pub const WELCOME: &str = "👋 Hi! Welcome aboard! 🎉\n\n\
Here you can:\n\
💳 Apply for a credit card\n\
💰 Get a quick loan\n\
🛡 Arrange insurance\n\
💼 Find a job\n\n\
Pick an action below:";

pub const WELCOME_BACK: &str = "👋 Welcome back! 🎉\n\nPick a section to continue:";

pub const HELP: &str = "📚 Help\n\n\
- /start: launch the bot\n\
- /menu: return to the main menu";

pub const CHOOSE_SECTION: &str = "Pick a section:";

pub const CHOOSE_OPTION: &str = "Pick an option:";

pub const REQUEST_PHONE: &str = "Please share your phone number to continue.";

pub const PHONE_SAVED: &str = "✅ Your details are saved. Pick a section:";

pub const SUBSCRIPTION_CONFIRMED: &str = "✅ Thanks for subscribing! Pick a section:";

pub const VERIFY_FAILED: &str =
    "⚠️ Could not verify your subscription. Please try again in a moment.";

pub const INVALID_CHOICE: &str = "Invalid choice. Please pick an item from the menu.";

pub const UNRECOGNIZED: &str = "Sorry, I didn't understand that. Try /menu.";

pub const ACCESS_DENIED: &str = "🚫 You don't have access to this command.";

pub const BROADCAST_PROMPT: &str = "Enter the broadcast text:";

pub const BROADCAST_EMPTY: &str = "There are no users to broadcast to.";

pub const NO_USERS: &str = "The user list is empty.";

pub const TRY_AGAIN: &str = "⚠️ Something went wrong on our side. Please try again.";

pub const FALLBACK: &str = "Sorry, something went wrong. Try /menu.";

pub const CREDIT_CARDS_NOTE: &str =
    "You picked the Credit Cards section. More options will appear here.";

/// Subscribe prompt naming the required channel.
pub fn subscribe_required(channel_name: &str) -> String {
    format!("❌ To access this section, subscribe to our channel: {channel_name}.")
}

/// Operator-facing summary of a finished broadcast.
pub fn broadcast_summary(result: &BroadcastResult) -> String {
    format!(
        "✅ Broadcast finished.\nDelivered: {}\nFailed: {}",
        result.succeeded, result.failed
    )
}
