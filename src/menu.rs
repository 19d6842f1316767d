//! Fixed menu content — sections, offer lists, and keyboard builders.
//!
//! Sections are a closed enum dispatching to data-only offer lists, so
//! content changes never touch control flow.

use crate::events::{InlineButton, KeyboardSpec, ReplyButton};

/// Label of the "begin" button on the welcome keyboard.
pub const BEGIN_LABEL: &str = "🚀 Begin";
/// Label of the "help" button on the welcome keyboard.
pub const HELP_LABEL: &str = "ℹ️ Help";
/// Label of the "start over" button on the main menu.
pub const RESTART_LABEL: &str = "🔄 Start over";
/// Label of the share-contact button.
pub const SHARE_PHONE_LABEL: &str = "📞 Share my number";
/// Label of the back-to-menu inline button.
const BACK_LABEL: &str = "🔙 Back";

/// A single affiliate offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    pub title: &'static str,
    pub url: &'static str,
}

/// The gated menu sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuSection {
    CreditCards,
    Loans,
    Insurance,
    Jobs,
    BonusVault,
}

impl MenuSection {
    pub const ALL: [MenuSection; 5] = [
        Self::CreditCards,
        Self::Loans,
        Self::Insurance,
        Self::Jobs,
        Self::BonusVault,
    ];

    /// Menu button label for this section.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreditCards => "💳 Credit Cards",
            Self::Loans => "💰 Quick Loans",
            Self::Insurance => "🛡 Insurance",
            Self::Jobs => "💼 Career Navigator",
            Self::BonusVault => "🎁 Bonus Vault",
        }
    }

    /// Resolve a menu button label back to its section.
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == text)
    }

    /// The fixed offer list for this section.
    pub fn offers(&self) -> &'static [Offer] {
        match self {
            Self::CreditCards => CREDIT_CARD_OFFERS,
            Self::Loans => LOAN_OFFERS,
            Self::Insurance => INSURANCE_OFFERS,
            Self::Jobs => JOB_OFFERS,
            Self::BonusVault => BONUS_OFFERS,
        }
    }

    /// Inline keyboard for this section: its offers plus a back button.
    pub fn keyboard(&self) -> KeyboardSpec {
        let mut rows: Vec<Vec<InlineButton>> = Vec::new();
        if *self == Self::CreditCards {
            // The credit cards section keeps a drill-down callback row
            // ahead of its offer links.
            rows.push(vec![InlineButton::callback("Credit Cards", "credit_cards")]);
        }
        for offer in self.offers() {
            rows.push(vec![InlineButton::url(offer.title, offer.url)]);
        }
        rows.push(vec![InlineButton::callback(BACK_LABEL, "back_to_menu")]);
        KeyboardSpec::Inline { rows }
    }
}

const CREDIT_CARD_OFFERS: &[Offer] = &[
    Offer {
        title: "Credit Navigator",
        url: "https://offers.example.com/credit-navigator",
    },
    Offer {
        title: "Northbank — Everyday Credit Card",
        url: "https://trk.offers.example.com/click/northbank-everyday",
    },
    Offer {
        title: "T-Bank — Platinum Credit Card",
        url: "https://trk.offers.example.com/click/tbank-platinum",
    },
    Offer {
        title: "Uralium — Cashback Credit Card",
        url: "https://trk.offers.example.com/click/uralium-cashback",
    },
    Offer {
        title: "Comet Bank — Installment Card",
        url: "https://trk.offers.example.com/click/comet-installment",
    },
];

const LOAN_OFFERS: &[Offer] = &[
    Offer {
        title: "Loan Master",
        url: "https://offers.example.com/loan-master",
    },
    Offer {
        title: "MoneyNow",
        url: "https://trk.offers.example.com/click/moneynow",
    },
    Offer {
        title: "JoyCredit",
        url: "https://trk.offers.example.com/click/joycredit",
    },
    Offer {
        title: "Target Finance",
        url: "https://trk.offers.example.com/click/target-finance",
    },
    Offer {
        title: "KindLoan",
        url: "https://trk.offers.example.com/click/kindloan",
    },
];

const INSURANCE_OFFERS: &[Offer] = &[
    Offer {
        title: "Car Insurance",
        url: "https://insure.offers.example.com/car",
    },
    Offer {
        title: "Mortgage Insurance",
        url: "https://insure.offers.example.com/mortgage",
    },
];

const JOB_OFFERS: &[Offer] = &[
    Offer {
        title: "Career Navigator",
        url: "https://offers.example.com/career-navigator",
    },
    Offer {
        title: "Courier for FoodDash",
        url: "https://trk.offers.example.com/click/fooddash-courier",
    },
    Offer {
        title: "Magnet Retail — Category E Driver",
        url: "https://trk.offers.example.com/click/magnet-driver",
    },
    Offer {
        title: "Crew Member at Burger Palace",
        url: "https://trk.offers.example.com/click/burger-palace",
    },
    Offer {
        title: "Card Delivery Specialist at Alpha Bank",
        url: "https://trk.offers.example.com/click/alpha-delivery",
    },
    Offer {
        title: "Sales Specialist at MTC Telecom",
        url: "https://trk.offers.example.com/click/mtc-sales",
    },
];

const BONUS_OFFERS: &[Offer] = &[Offer {
    title: "Bonus Vault: your gift is waiting!",
    url: "https://offers.example.com/gifts/bonus-vault",
}];

// ── Keyboard builders ───────────────────────────────────────────────

/// Welcome keyboard: begin + help.
pub fn welcome_keyboard() -> KeyboardSpec {
    KeyboardSpec::Reply {
        rows: vec![
            vec![ReplyButton::new(BEGIN_LABEL)],
            vec![ReplyButton::new(HELP_LABEL)],
        ],
    }
}

/// Main menu keyboard: the five sections plus start-over.
pub fn main_menu_keyboard() -> KeyboardSpec {
    KeyboardSpec::Reply {
        rows: vec![
            vec![
                ReplyButton::new(MenuSection::CreditCards.label()),
                ReplyButton::new(MenuSection::Loans.label()),
            ],
            vec![
                ReplyButton::new(MenuSection::Insurance.label()),
                ReplyButton::new(MenuSection::Jobs.label()),
            ],
            vec![
                ReplyButton::new(MenuSection::BonusVault.label()),
                ReplyButton::new(RESTART_LABEL),
            ],
        ],
    }
}

/// Subscribe prompt keyboard: channel link + "I subscribed" re-check.
pub fn subscribe_keyboard(channel_id: &str, channel_name: &str) -> KeyboardSpec {
    let channel_ref = channel_id.trim_start_matches('-');
    KeyboardSpec::Inline {
        rows: vec![
            vec![InlineButton::url(
                format!("📢 Subscribe to {channel_name}"),
                format!("https://t.me/{channel_ref}"),
            )],
            vec![InlineButton::callback("✅ I subscribed", "check_subscription")],
        ],
    }
}

/// Single-button keyboard requesting the user's contact.
pub fn share_phone_keyboard() -> KeyboardSpec {
    KeyboardSpec::Reply {
        rows: vec![vec![ReplyButton::contact(SHARE_PHONE_LABEL)]],
    }
}
