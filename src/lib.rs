//! The syscall recording core of a deterministic record/replay tracer for
//! Linux processes.
//!
//! Everything here runs between two ptrace traps: `rec_prepare_syscall` at
//! syscall entry decides whether the tracee may be context-switched while the
//! kernel runs and, if so, redirects in/out parameter buffers into a private
//! per-task scratch region; `rec_process_syscall` at syscall exit copies
//! scratch contents back, restores the registers and in-memory pointers it
//! clobbered, and records the exact bytes the kernel produced.
//!
//! Tracee control (ptrace), the trace writer, the scheduler and address-space
//! bookkeeping are collaborators reached through the `Task` trait in
//! `session::task`.

#![allow(dead_code)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate static_assertions;
#[macro_use]
extern crate memoffset;

#[macro_use]
pub mod log;
#[macro_use]
pub mod kernel_abi;

pub mod address_space;
pub mod arch;
pub mod arch_structs;
pub mod event;
pub mod flags;
pub mod kernel_metadata;
pub mod kernel_supplement;
pub mod preload_interface;
pub mod record_syscall;
pub mod registers;
pub mod remote_ptr;
pub mod session;
pub mod trace;
pub mod util;
