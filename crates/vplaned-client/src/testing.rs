//! Transport double for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use vplaned_frame::Message;

use crate::channel::Transport;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Send(Message),
    Recv,
    Disconnect,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<Message> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

/// Replays queued replies in order. Once the queue is empty it either echoes
/// the last request behind an `OK` part or times out.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    log: EventLog,
    replies: VecDeque<Result<Message>>,
    send_errors: VecDeque<ClientError>,
    echo: bool,
    delay: Duration,
    last_sent: Option<Message>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, reply: Message) -> Self {
        self.replies.push_back(Ok(reply));
        self
    }

    pub(crate) fn reply_parts(self, parts: &[&'static str]) -> Self {
        self.reply(parts.iter().copied().collect())
    }

    pub(crate) fn fail(mut self, err: ClientError) -> Self {
        self.replies.push_back(Err(err));
        self
    }

    /// Fail the next send with `err` without recording it.
    pub(crate) fn reject_send(mut self, err: ClientError) -> Self {
        self.send_errors.push_back(err);
        self
    }

    pub(crate) fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Sleep between send and receive.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn log(&self) -> EventLog {
        self.log.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, message: &Message) -> Result<()> {
        if let Some(err) = self.send_errors.pop_front() {
            return Err(err);
        }
        self.log.push(Event::Send(message.clone()));
        self.last_sent = Some(message.clone());
        Ok(())
    }

    fn recv(&mut self) -> Result<Message> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.log.push(Event::Recv);

        if let Some(reply) = self.replies.pop_front() {
            return reply;
        }
        match (&self.last_sent, self.echo) {
            (Some(sent), true) => {
                let mut reply = Message::single(Bytes::from_static(b"OK"));
                for part in sent.parts() {
                    reply.push(part.clone());
                }
                Ok(reply)
            }
            _ => Err(ClientError::Timeout(Duration::ZERO)),
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        self.log.push(Event::Disconnect);
        Ok(())
    }
}
