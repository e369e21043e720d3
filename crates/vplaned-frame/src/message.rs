//! Multi-part messages.

use bytes::Bytes;

use crate::codec::Frame;

/// An ordered list of parts sent or received as one unit.
///
/// A message may have zero parts; on the wire that is a single `VOID` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Bytes>,
}

impl Message {
    /// An empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// A message with exactly one part.
    pub fn single(part: impl Into<Bytes>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// Append a part.
    pub fn push(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    /// Builder form of [`Message::push`].
    pub fn with_part(mut self, part: impl Into<Bytes>) -> Self {
        self.push(part);
        self
    }

    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.parts.get(index)
    }

    /// First part, usually the status token of a reply.
    pub fn first(&self) -> Option<&Bytes> {
        self.parts.first()
    }

    /// Split into wire frames, setting `MORE` on all but the last.
    pub fn to_frames(&self) -> Vec<Frame> {
        if self.parts.is_empty() {
            return vec![Frame::void()];
        }
        let last = self.parts.len() - 1;
        self.parts
            .iter()
            .enumerate()
            .map(|(i, part)| Frame::new(part.clone(), i != last))
            .collect()
    }

    /// Total payload bytes across all parts.
    pub fn payload_size(&self) -> usize {
        self.parts.iter().map(Bytes::len).sum()
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }
}

impl<P: Into<Bytes>> FromIterator<P> for Message {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().map(Into::into).collect(),
        }
    }
}
