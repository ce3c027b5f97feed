//! The recording core does not write traces itself; the session's trace
//! writer does. This module carries the vocabulary shared with that
//! collaborator: its verdict on whether a mapping's contents belong in the
//! trace.

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RecordInTrace {
    DontRecordInTrace,
    RecordInTrace,
}
