//! Console output formatter for sessions

use colored::Colorize;
use horo_application::SessionView;
use horo_domain::{
    Awaiting, ChatMessage, ChatRoom, NotificationMessage, OrderAction, OrderSummary, Trigger,
    UserId,
};

/// Formats session state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One timeline entry.
    pub fn format_message(message: &ChatMessage, me: &UserId, room: Option<&ChatRoom>) -> String {
        match message {
            ChatMessage::Text(text) => {
                let time = text.created_at.format("%H:%M");
                let who = if &text.sender_id == me {
                    "you".green().bold()
                } else {
                    let name = room
                        .map(|r| r.display_name(&text.sender_id))
                        .unwrap_or_else(|| text.sender_id.to_string());
                    name.yellow().bold()
                };
                format!("{} {}: {}", format!("[{time}]").dimmed(), who, text.content)
            }
            ChatMessage::Notification(notification) => {
                format!("{} {}", "*".cyan().bold(), Self::describe(notification).cyan())
            }
        }
    }

    /// Human-readable text for a notification.
    pub fn describe(notification: &NotificationMessage) -> String {
        let detail = &notification.detail;
        let amount = detail
            .amount
            .map(|a| format!(" ({a:.2})"))
            .unwrap_or_default();
        let course = detail
            .course_name
            .as_deref()
            .map(|c| format!(" for {c}"))
            .unwrap_or_default();
        match notification.trigger {
            Trigger::OrderCreated => format!("Order created{course}"),
            Trigger::OrderPaymentBound => format!("Payment requested{amount}"),
            Trigger::OrderPaid | Trigger::PaymentSuccess => format!("Order paid{course}{amount}"),
            Trigger::OrderCompleted => "Session completed by both sides".to_string(),
            Trigger::PaymentCreated | Trigger::PaymentSettled => {
                format!("Payment update: {}{amount}", notification.trigger)
            }
            Trigger::ChatMessageIncoming | Trigger::ChatMessageOutgoing => detail
                .summary
                .clone()
                .unwrap_or_else(|| notification.trigger.to_string()),
        }
    }

    /// Order status block.
    pub fn format_order(order: Option<&OrderSummary>) -> String {
        let Some(order) = order else {
            return format!("{} {}", "Order:".cyan().bold(), "none".dimmed());
        };
        let mut output = format!(
            "{} {} {}  {:.2}",
            "Order:".cyan().bold(),
            order.short_id(),
            order.status.label().bold(),
            order.amount
        );
        output.push_str(&format!(
            "\n  customer done: {}  prophet done: {}",
            Self::check(order.is_customer_completed),
            Self::check(order.is_prophet_completed)
        ));
        output
    }

    /// The `/status` block: room, connection, order and what to do next.
    pub fn format_view(view: &SessionView, me: &UserId) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("horo session"));
        output.push('\n');

        let connection = if view.connected {
            "connected".green()
        } else {
            "disconnected".red()
        };
        output.push_str(&format!(
            "{} {}  {} {}\n",
            "Stream:".cyan().bold(),
            connection,
            "Role:".cyan().bold(),
            view.role
        ));

        match (&view.room_id, &view.room) {
            (Some(_), Some(room)) => {
                let counterpart = room
                    .counterpart_of(me)
                    .map(|id| room.display_name(id))
                    .unwrap_or_else(|| "?".to_string());
                output.push_str(&format!(
                    "{} {} with {} ({} messages)\n",
                    "Room:".cyan().bold(),
                    room.course_name.as_deref().unwrap_or(room.course_id.as_str()),
                    counterpart,
                    view.timeline.len()
                ));
            }
            (Some(room_id), None) => output.push_str(&format!(
                "{} {} ({} messages)\n",
                "Room:".cyan().bold(),
                room_id,
                view.timeline.len()
            )),
            (None, _) => {
                output.push_str(&format!("{} {}\n", "Room:".cyan().bold(), "none (use /join)".dimmed()));
            }
        }

        if view.room_id.is_some() {
            output.push_str(&Self::format_order(view.order.as_ref()));
            output.push('\n');
            output.push_str(&Self::format_next_step(&view.permitted, view.awaiting));
            output.push('\n');
        }

        if let Some(error) = &view.last_error {
            output.push_str(&format!("{} {}\n", "Last error:".red().bold(), error));
        }

        output.push_str(&Self::footer());
        output
    }

    /// What the participant can do, or what they are waiting for.
    pub fn format_next_step(permitted: &[OrderAction], awaiting: Awaiting) -> String {
        if !permitted.is_empty() {
            let actions = permitted
                .iter()
                .map(|a| Self::command_for(*a))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("{} {}", "You can:".green().bold(), actions);
        }
        let waiting = match awaiting {
            Awaiting::OrderCreation => "the customer to create an order".to_string(),
            Awaiting::Payment => "the customer to pay".to_string(),
            Awaiting::Counterpart(role) => format!("the {role} to mark the session done"),
            Awaiting::Nothing => return format!("{} nothing to do", "Next:".dimmed()),
        };
        format!("{} {}", "Waiting for".yellow().bold(), waiting)
    }

    /// The console command that performs `action`.
    pub fn command_for(action: OrderAction) -> &'static str {
        match action {
            OrderAction::CreateOrder => "/create",
            OrderAction::Pay => "/pay",
            OrderAction::MarkProphetDone | OrderAction::MarkCustomerDone => "/done",
            OrderAction::WriteReview => "/review",
        }
    }

    /// `/rooms` listing.
    pub fn format_rooms(rooms: &[ChatRoom], me: &UserId, active: Option<&str>) -> String {
        if rooms.is_empty() {
            return format!("{}\n", "No rooms.".dimmed());
        }
        let mut output = String::new();
        for room in rooms {
            let marker = if Some(room.id.as_str()) == active {
                ">".green().bold()
            } else {
                " ".normal()
            };
            let counterpart = room
                .counterpart_of(me)
                .map(|id| room.display_name(id))
                .unwrap_or_else(|| "?".to_string());
            let done = if room.is_done { " [done]".dimmed() } else { "".normal() };
            output.push_str(&format!(
                "{} {}  {} with {}{}\n",
                marker,
                room.id.as_str().bold(),
                room.course_name.as_deref().unwrap_or(room.course_id.as_str()),
                counterpart,
                done
            ));
            if !room.last_message.is_empty() {
                output.push_str(&format!("    {}\n", room.last_message.dimmed()));
            }
        }
        output
    }

    fn check(done: bool) -> colored::ColoredString {
        if done { "yes".green() } else { "no".normal() }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(48);
        format!("{}\n{:^48}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(48).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use horo_domain::{NotificationDetail, OrderStatus, Role, TextMessage};
    use std::sync::Arc;

    fn plain() {
        colored::control::set_override(false);
    }

    fn room() -> ChatRoom {
        ChatRoom {
            id: "r1".into(),
            prophet_id: "p1".into(),
            customer_id: "c1".into(),
            course_id: "C1".into(),
            created_at: None,
            last_message: "see you".into(),
            is_done: false,
            prophet_name: Some("Madame X".into()),
            customer_name: None,
            course_name: Some("Tarot".into()),
        }
    }

    fn order(status: OrderStatus) -> OrderSummary {
        OrderSummary {
            order_id: "7a230ed4-b2d9-4004".into(),
            room_id: "r1".into(),
            course_id: "C1".into(),
            customer_id: "c1".into(),
            is_customer_completed: false,
            is_prophet_completed: true,
            order_date: None,
            status,
            amount: 250.0,
            payment_id: None,
        }
    }

    #[test]
    fn test_text_message_uses_display_name() {
        plain();
        let message = ChatMessage::Text(TextMessage {
            message_id: "m1".into(),
            room_id: "r1".into(),
            sender_id: "p1".into(),
            content: "hello".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap(),
        });
        let line = ConsoleFormatter::format_message(&message, &"c1".into(), Some(&room()));
        assert_eq!(line, "[09:05] Madame X: hello");

        let mine = ConsoleFormatter::format_message(&message, &"p1".into(), None);
        assert_eq!(mine, "[09:05] you: hello");
    }

    #[test]
    fn test_notification_description() {
        plain();
        let notification = NotificationMessage {
            message_id: "m2".into(),
            room_id: "r1".into(),
            sender_id: "system".into(),
            trigger: Trigger::OrderPaid,
            detail: NotificationDetail {
                amount: Some(250.0),
                course_name: Some("Tarot".into()),
                ..Default::default()
            },
            created_at: None,
        };
        assert_eq!(
            ConsoleFormatter::describe(&notification),
            "Order paid for Tarot (250.00)"
        );
    }

    #[test]
    fn test_order_block() {
        plain();
        let block = ConsoleFormatter::format_order(Some(&order(OrderStatus::ProphetDone)));
        assert!(block.contains("7a230ed4"));
        assert!(block.contains("PROPHET DONE"));
        assert!(block.contains("prophet done: yes"));
        assert!(ConsoleFormatter::format_order(None).contains("none"));
    }

    #[test]
    fn test_next_step() {
        plain();
        assert_eq!(
            ConsoleFormatter::format_next_step(&[OrderAction::Pay], Awaiting::Nothing),
            "You can: /pay"
        );
        assert_eq!(
            ConsoleFormatter::format_next_step(&[], Awaiting::Counterpart(Role::Customer)),
            "Waiting for the customer to mark the session done"
        );
    }

    #[test]
    fn test_view_with_room() {
        plain();
        let view = SessionView {
            room_id: Some("r1".into()),
            room: Some(room()),
            role: Role::Customer,
            connected: true,
            timeline: Arc::from(Vec::new()),
            order: Some(order(OrderStatus::ProphetDone)),
            permitted: vec![OrderAction::MarkCustomerDone],
            awaiting: Awaiting::Nothing,
            last_error: Some("Request failed with status 500: boom".into()),
        };
        let output = ConsoleFormatter::format_view(&view, &"c1".into());
        assert!(output.contains("Stream: connected"));
        assert!(output.contains("Room: Tarot with Madame X (0 messages)"));
        assert!(output.contains("You can: /done"));
        assert!(output.contains("Last error: Request failed"));
    }

    #[test]
    fn test_rooms_listing() {
        plain();
        let output = ConsoleFormatter::format_rooms(&[room()], &"c1".into(), Some("r1"));
        assert!(output.starts_with("> r1  Tarot with Madame X"));
        assert!(output.contains("see you"));
        assert!(ConsoleFormatter::format_rooms(&[], &"c1".into(), None).contains("No rooms"));
    }
}
