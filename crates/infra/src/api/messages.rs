//! Localized user-facing messages

use lugn_domain::Locale;

/// "Too many requests, retry in N seconds"
pub fn rate_limited(locale: Locale, retry_after_secs: u64) -> String {
    match locale {
        Locale::Sv => {
            format!("För många förfrågningar. Försök igen om {retry_after_secs} sekunder.")
        }
        Locale::En => format!("Too many requests. Please try again in {retry_after_secs} seconds."),
    }
}

/// Notice returned when a mutating request was parked in the offline queue
pub const fn queued_offline(locale: Locale) -> &'static str {
    match locale {
        Locale::Sv => {
            "Du är offline. Ändringen har sparats och synkroniseras när du är ansluten igen."
        }
        Locale::En => "You are offline. Your change was saved and will sync once you reconnect.",
    }
}

pub const fn network_error(locale: Locale) -> &'static str {
    match locale {
        Locale::Sv => "Nätverksfel. Kontrollera din internetanslutning och försök igen.",
        Locale::En => "Network error. Check your internet connection and try again.",
    }
}

pub const fn session_expired(locale: Locale) -> &'static str {
    match locale {
        Locale::Sv => "Din session har gått ut. Logga in igen.",
        Locale::En => "Your session has expired. Please sign in again.",
    }
}

pub const fn generic_failure(locale: Locale) -> &'static str {
    match locale {
        Locale::Sv => "Något gick fel. Försök igen senare.",
        Locale::En => "Something went wrong. Please try again later.",
    }
}
