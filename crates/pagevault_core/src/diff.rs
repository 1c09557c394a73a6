//! Byte-level edit scripts between consecutive revisions.
//!
//! A [`Delta`] turns the previous revision's text into the next one. It is
//! computed with `similar`'s Myers diff over bytes, which strips the
//! common prefix and suffix first, so the usual single-point edit (typing,
//! pasting, deleting a selection) stays cheap.
//!
//! ## Bounded search
//!
//! The search gives up refining after [`DIFF_DEADLINE`]. The script is
//! still exact, merely less compact. Such deltas are usually large enough
//! that the log stores a snapshot instead anyway.

use crate::error::{CoreError, CoreResult};
use similar::{capture_diff_slices_deadline, Algorithm, DiffOp};
use std::time::{Duration, Instant};

/// Time spent searching for a minimal script before settling for a
/// coarser one.
pub const DIFF_DEADLINE: Duration = Duration::from_millis(50);

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOp {
    /// Copy the next `n` bytes of the base text.
    Retain(usize),
    /// Skip the next `n` bytes of the base text.
    Delete(usize),
    /// Emit these bytes.
    Insert(Vec<u8>),
}

/// An edit script that rewrites one text into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    ops: Vec<DeltaOp>,
}

impl Delta {
    /// Builds a delta from raw operations, merging adjacent ones of the
    /// same kind and dropping empty ones.
    #[must_use]
    pub fn from_ops(ops: impl IntoIterator<Item = DeltaOp>) -> Self {
        let mut delta = Self::default();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    /// Computes the edit script turning `base` into `target`.
    #[must_use]
    pub fn between(base: &[u8], target: &[u8]) -> Self {
        let deadline = Instant::now().checked_add(DIFF_DEADLINE);
        let ops = capture_diff_slices_deadline(Algorithm::Myers, base, target, deadline);

        let mut delta = Self::default();
        for op in ops {
            match op {
                DiffOp::Equal { len, .. } => delta.push(DeltaOp::Retain(len)),
                DiffOp::Delete { old_len, .. } => delta.push(DeltaOp::Delete(old_len)),
                DiffOp::Insert {
                    new_index, new_len, ..
                } => delta.push(DeltaOp::Insert(
                    target[new_index..new_index + new_len].to_vec(),
                )),
                DiffOp::Replace {
                    old_len,
                    new_index,
                    new_len,
                    ..
                } => {
                    delta.push(DeltaOp::Delete(old_len));
                    delta.push(DeltaOp::Insert(
                        target[new_index..new_index + new_len].to_vec(),
                    ));
                }
            }
        }
        delta
    }

    fn push(&mut self, op: DeltaOp) {
        match (self.ops.last_mut(), op) {
            (_, DeltaOp::Retain(0) | DeltaOp::Delete(0)) => {}
            (_, DeltaOp::Insert(bytes)) if bytes.is_empty() => {}
            (Some(DeltaOp::Retain(n)), DeltaOp::Retain(m)) => *n += m,
            (Some(DeltaOp::Delete(n)), DeltaOp::Delete(m)) => *n += m,
            (Some(DeltaOp::Insert(bytes)), DeltaOp::Insert(more)) => bytes.extend(more),
            (_, op) => self.ops.push(op),
        }
    }

    /// Returns the operations of the script.
    #[must_use]
    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// Returns the number of inserted plus deleted bytes.
    #[must_use]
    pub fn change_sum(&self) -> u64 {
        self.ops
            .iter()
            .map(|op| match op {
                DeltaOp::Retain(_) => 0,
                DeltaOp::Delete(n) => *n as u64,
                DeltaOp::Insert(bytes) => bytes.len() as u64,
            })
            .sum()
    }

    /// Returns the number of bytes this delta occupies in a page log.
    ///
    /// Matches the record encoding: one tag byte and a 4-byte length per
    /// operation, plus the inserted bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 + self
            .ops
            .iter()
            .map(|op| match op {
                DeltaOp::Insert(bytes) => 5 + bytes.len(),
                _ => 5,
            })
            .sum::<usize>()
    }

    /// Applies the script to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if the script does not consume
    /// `base` exactly, which means it was recorded against another text.
    pub fn apply(&self, base: &[u8]) -> CoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(base.len() + self.change_sum() as usize);
        let mut pos = 0usize;

        for op in &self.ops {
            match op {
                DeltaOp::Retain(n) => {
                    let end = pos.checked_add(*n).filter(|end| *end <= base.len());
                    let Some(end) = end else {
                        return Err(overrun(pos, *n, base.len()));
                    };
                    out.extend_from_slice(&base[pos..end]);
                    pos = end;
                }
                DeltaOp::Delete(n) => {
                    pos = pos
                        .checked_add(*n)
                        .filter(|end| *end <= base.len())
                        .ok_or_else(|| overrun(pos, *n, base.len()))?;
                }
                DeltaOp::Insert(bytes) => out.extend_from_slice(bytes),
            }
        }

        if pos != base.len() {
            return Err(CoreError::log_corruption(format!(
                "delta consumed {pos} of {} base bytes",
                base.len()
            )));
        }
        Ok(out)
    }
}

fn overrun(pos: usize, n: usize, len: usize) -> CoreError {
    CoreError::log_corruption(format!(
        "delta runs past base text: {n} bytes at offset {pos}, base is {len} bytes"
    ))
}
