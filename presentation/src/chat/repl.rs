//! Line-based console for a live session

use super::command::{ChatCommand, HELP};
use crate::listener::ConsoleListener;
use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use horo_application::{SessionError, SessionOrchestrator, SubmitOutcome};
use horo_domain::{RoomId, UserId};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

/// Reads commands from a terminal and drives the session.
pub struct ChatRepl {
    session: Arc<SessionOrchestrator>,
    listener: Arc<ConsoleListener>,
    me: UserId,
}

impl ChatRepl {
    pub fn new(
        session: Arc<SessionOrchestrator>,
        listener: Arc<ConsoleListener>,
        me: UserId,
    ) -> Self {
        Self {
            session,
            listener,
            me,
        }
    }

    /// Run on stdin until `/quit` or end of input.
    pub async fn run(&self, initial_room: Option<RoomId>) -> io::Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin()), initial_room)
            .await
    }

    pub async fn run_with<R: AsyncBufRead + Unpin>(
        &self,
        input: R,
        initial_room: Option<RoomId>,
    ) -> io::Result<()> {
        self.print_welcome();

        match self.session.rooms().await {
            Ok(rooms) => self.listener.remember_rooms(&rooms),
            Err(e) => debug!("Initial room listing failed: {}", e),
        }
        if let Some(room) = initial_room {
            self.join(room).await;
        }

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let command = match ChatCommand::parse(&line) {
                None => continue,
                Some(Ok(command)) => command,
                Some(Err(e)) => {
                    println!("{}", e.to_string().yellow());
                    continue;
                }
            };
            if command == ChatCommand::Quit {
                break;
            }
            self.dispatch(command).await;
        }

        println!("Bye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│                 horo chat                   │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Signed in as {} ({})", self.me, self.session.role());
        println!();
        println!("{}", HELP);
        println!();
    }

    async fn dispatch(&self, command: ChatCommand) {
        match command {
            ChatCommand::Say(text) => {
                if let Err(e) = self.session.send_text(&text) {
                    self.report(&e);
                }
            }
            ChatCommand::Rooms => match self.session.rooms().await {
                Ok(rooms) => {
                    self.listener.remember_rooms(&rooms);
                    let active = self.session.active_room();
                    print!(
                        "{}",
                        ConsoleFormatter::format_rooms(
                            &rooms,
                            &self.me,
                            active.as_ref().map(RoomId::as_str)
                        )
                    );
                }
                Err(e) => self.report(&e),
            },
            ChatCommand::Join(room) => self.join(room).await,
            ChatCommand::Order => match self.session.refresh_order().await {
                Ok(None) => println!("{}", ConsoleFormatter::format_order(None)),
                // Adopted snapshots are printed by the listener
                Ok(Some(_)) => {}
                Err(e) => println!("{} {}", "error".red().bold(), e),
            },
            ChatCommand::Create => {
                if let Err(e) = self.session.create_order().await {
                    self.report(&e);
                }
            }
            ChatCommand::Pay => match self.session.pay().await {
                Ok(payment) => println!(
                    "{} {}; waiting for the order to update",
                    "Paid".green().bold(),
                    payment
                ),
                Err(e) => self.report(&e),
            },
            ChatCommand::Done => match self.session.mark_done().await {
                Ok(SubmitOutcome::Submitted) => println!("{}", "Marked done".green().bold()),
                Ok(SubmitOutcome::AlreadySubmitted) => {
                    println!("{}", "Already submitted, waiting for the server".dimmed())
                }
                Err(e) => self.report(&e),
            },
            ChatCommand::Review(review) => match self.session.submit_review(&review).await {
                Ok(SubmitOutcome::Submitted) => println!("{}", "Review submitted".green().bold()),
                Ok(SubmitOutcome::AlreadySubmitted) => {
                    println!("{}", "Review already submitted".dimmed())
                }
                Err(e) => self.report(&e),
            },
            ChatCommand::Status => {
                print!("{}", ConsoleFormatter::format_view(&self.session.view(), &self.me));
            }
            ChatCommand::Help => println!("{}", HELP),
            ChatCommand::Quit => {}
        }
    }

    async fn join(&self, room: RoomId) {
        if let Err(e) = self.session.select_room(&room).await {
            self.report(&e);
        }
        let view = self.session.view();
        let room_meta = view.room.as_ref();
        for message in view.timeline.iter() {
            println!(
                "{}",
                ConsoleFormatter::format_message(message, &self.me, room_meta)
            );
        }
        println!(
            "{}",
            ConsoleFormatter::format_next_step(&view.permitted, view.awaiting)
        );
    }

    /// Print errors the session has not already reported to the listener.
    fn report(&self, error: &SessionError) {
        if matches!(error, SessionError::Sync(_)) {
            return;
        }
        println!("{} {}", "error".red().bold(), error);
    }
}
