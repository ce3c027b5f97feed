use libc::pid_t;
use std::ffi::{OsStr, OsString};

/// A task lifecycle record destined for the trace: a new task came into
/// existence via clone/fork, or an existing one replaced its image via a
/// successful execve. The trace writer owns the encoding.
#[derive(Clone)]
pub struct TraceTaskEvent {
    pub(crate) tid_: pid_t,
    pub(crate) variant: TraceTaskEventVariant,
}

#[derive(Clone)]
pub enum TraceTaskEventVariant {
    Clone(TraceTaskEventClone),
    Exec(TraceTaskEventExec),
}

impl TraceTaskEvent {
    pub fn for_clone(tid: pid_t, parent_tid: pid_t, clone_flags: usize) -> TraceTaskEvent {
        TraceTaskEvent {
            tid_: tid,
            variant: TraceTaskEventVariant::Clone(TraceTaskEventClone {
                parent_tid_: parent_tid,
                clone_flags_: clone_flags,
            }),
        }
    }

    pub fn for_exec(tid: pid_t, file_name: &OsStr, cmd_line: Vec<OsString>) -> TraceTaskEvent {
        TraceTaskEvent {
            tid_: tid,
            variant: TraceTaskEventVariant::Exec(TraceTaskEventExec {
                file_name_: file_name.to_owned(),
                cmd_line_: cmd_line,
            }),
        }
    }

    pub fn tid(&self) -> pid_t {
        self.tid_
    }

    pub fn variant(&self) -> &TraceTaskEventVariant {
        &self.variant
    }

    pub fn clone_variant(&self) -> &TraceTaskEventClone {
        match &self.variant {
            TraceTaskEventVariant::Clone(v) => v,
            _ => panic!("Not a TraceTaskEvent clone variant"),
        }
    }

    pub fn exec_variant(&self) -> &TraceTaskEventExec {
        match &self.variant {
            TraceTaskEventVariant::Exec(v) => v,
            _ => panic!("Not a TraceTaskEvent exec variant"),
        }
    }
}

#[derive(Clone)]
pub struct TraceTaskEventClone {
    pub(crate) parent_tid_: pid_t,
    pub(crate) clone_flags_: usize,
}

impl TraceTaskEventClone {
    pub fn parent_tid(&self) -> pid_t {
        self.parent_tid_
    }
    pub fn clone_flags(&self) -> usize {
        self.clone_flags_
    }
}

#[derive(Clone)]
pub struct TraceTaskEventExec {
    pub(crate) file_name_: OsString,
    pub(crate) cmd_line_: Vec<OsString>,
}

impl TraceTaskEventExec {
    pub fn file_name(&self) -> &OsStr {
        &self.file_name_
    }
    pub fn cmd_line(&self) -> &[OsString] {
        &self.cmd_line_
    }
}
