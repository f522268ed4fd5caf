//! # Simulated Action Detection
//!
//! The persona never executes anything real; it *announces* outcomes in
//! prose ("your order has been placed"). This module recognizes those
//! announcements in reply text and surfaces them as typed events so the
//! rest of the system (logging today, a real POS or booking integration
//! later) gets structure instead of having to grep reply strings itself.

use tracing::info;

/// An action the persona claims to have carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedAction {
    OrderPlaced,
    BookingConfirmed,
}

impl SimulatedAction {
    /// Console line announcing the action, matching what the persona
    /// promises the backend prints.
    fn announcement(&self) -> &'static str {
        match self {
            SimulatedAction::OrderPlaced => "--- Action: Food order placed! ---",
            SimulatedAction::BookingConfirmed => "--- Action: Table booking confirmed! ---",
        }
    }
}

/// Scan a reply for action announcements.
///
/// Matching is case-insensitive substring search over the trigger
/// phrases. Each action kind is reported at most once per reply,
/// however often its phrase occurs.
pub fn detect(reply: &str) -> Vec<SimulatedAction> {
    let lowered = reply.to_lowercase();
    let mut actions = Vec::new();

    if lowered.contains("order placed") {
        actions.push(SimulatedAction::OrderPlaced);
    }
    if lowered.contains("table confirmed") || lowered.contains("booking confirmed") {
        actions.push(SimulatedAction::BookingConfirmed);
    }

    actions
}

/// Detect actions in `reply` and log each one.
pub fn detect_and_log(reply: &str) -> Vec<SimulatedAction> {
    let actions = detect(reply);
    for action in &actions {
        info!(action = ?action, "{}", action.announcement());
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_order_placed() {
        let actions = detect("Great, your order placed just now will be ready in 20 minutes.");
        assert_eq!(actions, vec![SimulatedAction::OrderPlaced]);
    }

    #[test]
    fn detects_booking_variants() {
        assert_eq!(
            detect("Your table confirmed for 4 people at 6 PM."),
            vec![SimulatedAction::BookingConfirmed]
        );
        assert_eq!(
            detect("Booking confirmed! See you tomorrow."),
            vec![SimulatedAction::BookingConfirmed]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(detect("ORDER PLACED."), vec![SimulatedAction::OrderPlaced]);
    }

    #[test]
    fn repeated_phrase_reports_once() {
        let actions = detect("Order placed. Yes, your order placed successfully.");
        assert_eq!(actions, vec![SimulatedAction::OrderPlaced]);
    }

    #[test]
    fn both_actions_in_one_reply() {
        let actions = detect("Order placed, and your booking confirmed for tonight.");
        assert_eq!(
            actions,
            vec![
                SimulatedAction::OrderPlaced,
                SimulatedAction::BookingConfirmed
            ]
        );
    }

    #[test]
    fn plain_reply_has_no_actions() {
        assert!(detect("We close at 10:00 PM daily.").is_empty());
    }
}
