/// Owned Ethernet frame buffer.
///
/// A frame has exactly one holder at a time; handing it on is a move.
use alloc::vec::Vec;

use crate::config::MAX_FRAME_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    /// Copy `bytes` into a freshly allocated frame.
    ///
    /// Returns `None` when the data is empty, longer than `MAX_FRAME_LEN`,
    /// or the allocation fails.
    pub fn try_copy(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > MAX_FRAME_LEN {
            return None;
        }
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len()).ok()?;
        data.extend_from_slice(bytes);
        Some(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
