//! Prints session changes as they happen

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use horo_application::SessionListener;
use horo_domain::{ChatMessage, ChatRoom, OrderSummary, RoomId, UserId};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

/// Writes live messages, order changes and errors to a terminal.
pub struct ConsoleListener<W: Write + Send = std::io::Stdout> {
    me: UserId,
    out: Mutex<W>,
    rooms: Mutex<HashMap<RoomId, ChatRoom>>,
}

impl ConsoleListener {
    pub fn stdout(me: UserId) -> Self {
        Self::new(me, std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleListener<W> {
    pub fn new(me: UserId, out: W) -> Self {
        Self {
            me,
            out: Mutex::new(out),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Remember room metadata so senders can be shown by name.
    pub fn remember_rooms(&self, rooms: &[ChatRoom]) {
        let mut known = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        for room in rooms {
            known.insert(room.id.clone(), room.clone());
        }
    }

    fn line(&self, text: impl AsRef<str>) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{}", text.as_ref());
        let _ = out.flush();
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> SessionListener for ConsoleListener<W> {
    fn on_connection_changed(&self, connected: bool) {
        if connected {
            self.line(format!("{}", "-- connected".green()));
        } else {
            self.line(format!("{}", "-- disconnected".red()));
        }
    }

    fn on_message(&self, message: &ChatMessage) {
        let room = self
            .rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(message.room_id())
            .cloned();
        self.line(ConsoleFormatter::format_message(message, &self.me, room.as_ref()));
    }

    fn on_history_loaded(&self, room_id: &RoomId, count: usize) {
        self.line(format!(
            "{}",
            format!("-- loaded {count} earlier messages in {room_id}").dimmed()
        ));
    }

    fn on_order_changed(&self, _room_id: &RoomId, order: &OrderSummary) {
        self.line(ConsoleFormatter::format_order(Some(order)));
    }

    fn on_error(&self, room_id: Option<&RoomId>, error: &str) {
        let scope = room_id.map(|r| format!(" [{r}]")).unwrap_or_default();
        self.line(format!("{}{} {}", "error".red().bold(), scope, error));
    }
}
