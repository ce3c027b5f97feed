use crate::address_space::kernel_mapping::KernelMapping;
use crate::event::Switchable;
use crate::kernel_abi::SupportedArch;
use crate::kernel_supplement::KCMP_FILE;
use crate::preload_interface::syscallbuf_record;
use crate::registers::Registers;
use crate::remote_ptr::{RemotePtr, Void};
use crate::trace::trace_task_event::TraceTaskEvent;
use crate::trace::trace_writer::RecordInTrace;
use crate::util::ceil_page_size;
use libc::pid_t;
use std::cell::RefCell;
use std::ffi::{CString, OsString};
use std::mem::{size_of, zeroed};
use std::rc::Rc;
use std::slice;

pub type TaskSharedPtr = Rc<RefCell<dyn Task>>;

/// What fstat(2) on a tracee fd gives us: the kernel's name for the file
/// plus its stat record.
pub struct FileStat {
    pub file_name: OsString,
    pub st: libc::stat,
}

/// One tracee thread, as the syscall-recording core sees it. The concrete
/// implementation lives with the session/ptrace layer; everything the core
/// needs is behind this trait so the preparation/finalization engine never
/// touches ptrace directly.
///
/// Memory access is byte-granular (`read_bytes_helper`/`write_bytes_helper`);
/// the typed helpers below are built on top of those, the way the session
/// layer builds its own.
pub trait Task {
    fn tid(&self) -> pid_t;
    fn arch(&self) -> SupportedArch;

    /// Number of the syscall event currently being recorded on this task.
    /// Valid between the syscall-entry trap and the syscall-exit trap,
    /// including across restarts of the same interrupted syscall.
    fn current_syscall(&self) -> i32;

    fn regs(&self) -> Registers;
    fn set_regs(&mut self, regs: &Registers);

    fn read_bytes_helper(&mut self, addr: RemotePtr<Void>, buf: &mut [u8]);
    fn write_bytes_helper(&mut self, addr: RemotePtr<Void>, buf: &[u8]);

    /// Copy `num_bytes` from `src` to `dst`, both in tracee memory.
    fn remote_memcpy(&mut self, dst: RemotePtr<Void>, src: RemotePtr<Void>, num_bytes: usize) {
        let mut buf = vec![0u8; num_bytes];
        self.read_bytes_helper(src, &mut buf);
        self.write_bytes_helper(dst, &buf);
    }

    /// The private per-thread scratch region previously mapped into this
    /// tracee, and its capacity.
    fn scratch_ptr(&self) -> RemotePtr<Void>;
    fn scratch_size(&self) -> usize;
    fn set_scratch(&mut self, ptr: RemotePtr<Void>, num_bytes: usize);

    /// Execute an mmap in the tracee via the injected-syscall helper and
    /// return the mapped address. Used for scratch initialization; failure
    /// to map is fatal to the recording, hence "infallible".
    fn infallible_mmap_syscall(
        &mut self,
        addr: RemotePtr<Void>,
        length: usize,
        prot: i32,
        flags: i32,
        fd: i32,
        offset: u64,
    ) -> RemotePtr<Void>;

    /// Record `num_bytes` of tracee memory at `addr` into the trace.
    /// A null `addr` records an empty placeholder.
    fn record_remote(&mut self, addr: RemotePtr<Void>, num_bytes: usize);

    /// Like `record_remote`, but a null `addr` still emits a record: the
    /// presence of the (empty) record must be preserved across record and
    /// replay.
    fn record_remote_even_if_null(&mut self, addr: RemotePtr<Void>, num_bytes: usize);

    /// Record bytes we already hold locally as the contents of tracee
    /// memory at `addr`.
    fn record_local(&mut self, addr: RemotePtr<Void>, buf: &[u8]);

    /// Hand a finished mapping to the trace writer; its verdict decides
    /// whether we must also record the mapped contents.
    fn write_mapped_region(&mut self, map: &KernelMapping, prot: i32, flags: i32) -> RecordInTrace;

    fn write_task_event(&mut self, event: &TraceTaskEvent);

    /// Register a mapping in this task's VM bookkeeping.
    fn vm_map(&mut self, map: &KernelMapping);

    fn fstat(&mut self, fd: i32) -> FileStat;

    /// kcmp(KCMP_FILE) between a fd of ours and a fd of the tracee.
    /// Ok(0) means identical file objects; Err carries errno.
    fn kcmp_file(&self, tracer_fd: i32, tracee_fd: i32) -> Result<i32, i32> {
        let ret = unsafe {
            libc::syscall(
                libc::SYS_kcmp,
                libc::getpid() as libc::c_long,
                self.tid() as libc::c_long,
                KCMP_FILE as libc::c_long,
                tracer_fd as libc::c_long,
                tracee_fd as libc::c_long,
            )
        };
        if ret < 0 {
            Err(nix::errno::errno())
        } else {
            Ok(ret as i32)
        }
    }

    /// When this task was descheduled in the middle of a buffered syscall,
    /// the tracee address of the in-flight syscallbuf record.
    fn desched_rec(&self) -> Option<RemotePtr<syscallbuf_record>>;

    /// True when the current syscall is the desched-arming ioctl itself.
    fn is_desched_event_syscall(&self) -> bool;

    // Task-local mirrors the exit hooks keep fresh.
    fn update_prname(&mut self, addr: RemotePtr<Void>);
    fn set_robust_list(&mut self, addr: RemotePtr<Void>, num_bytes: usize);
    fn set_thread_area(&mut self, addr: RemotePtr<Void>);
    fn set_tid_addr(&mut self, addr: RemotePtr<Void>);
    fn update_sigaction(&mut self, regs: &Registers);
    fn update_sigmask(&mut self, regs: &Registers);
    fn set_sigsuspend_blocked_sigs(&mut self, sigs: Option<u64>);

    // Scheduler hooks.
    /// Adopt `priority` as this task's scheduling priority, whether or not
    /// the kernel accepted the setpriority call.
    fn update_priority(&mut self, priority: i32);
    /// The task asked to yield; let the scheduler run its round-robin pass.
    fn schedule_one_round_robin(&mut self);
    fn set_switchable(&mut self, switchable: Switchable);

    // Cross-task access, for clone and setpriority-on-other-task.
    fn find_task(&self, tid: pid_t) -> Option<TaskSharedPtr>;

    /// Maintain the synthetic event stack of a freshly cloned child.
    fn push_syscall_event(&mut self, syscallno: i32);
    fn pop_syscall_event(&mut self);

    // execve lifecycle notifications.
    fn pre_exec(&mut self);
    fn post_exec_syscall(&mut self);
}

/// Read `val` from `child_addr`.
pub fn read_val_mem<D>(task: &mut dyn Task, child_addr: RemotePtr<D>) -> D {
    let mut v: D = unsafe { zeroed() };
    let u8_slice = unsafe { slice::from_raw_parts_mut(&mut v as *mut D as *mut u8, size_of::<D>()) };
    task.read_bytes_helper(RemotePtr::cast(child_addr), u8_slice);
    v
}

/// Read `count` values from `child_addr`.
pub fn read_mem<D: Clone>(task: &mut dyn Task, child_addr: RemotePtr<D>, count: usize) -> Vec<D> {
    let mut v: Vec<D> = Vec::with_capacity(count);
    v.resize(count, unsafe { zeroed() });
    let u8_slice =
        unsafe { slice::from_raw_parts_mut(v.as_mut_ptr() as *mut u8, count * size_of::<D>()) };
    task.read_bytes_helper(RemotePtr::cast(child_addr), u8_slice);
    v
}

/// Write `val` to `child_addr`.
pub fn write_val_mem<D>(task: &mut dyn Task, child_addr: RemotePtr<D>, val: &D) {
    let u8_slice =
        unsafe { slice::from_raw_parts(val as *const D as *const u8, size_of::<D>()) };
    task.write_bytes_helper(RemotePtr::cast(child_addr), u8_slice);
}

/// Read a null-terminated string out of the tracee. We're only guaranteed
/// that [child_addr, end_of_page) is mapped, so scan page by page.
pub fn read_c_str(task: &mut dyn Task, child_addr: RemotePtr<u8>) -> CString {
    let mut p = child_addr;
    let mut s: Vec<u8> = Vec::new();
    loop {
        let end_of_page: RemotePtr<Void> = ceil_page_size(p.as_usize() + 1).into();
        let nbytes: usize = end_of_page - p;
        let mut buf = vec![0u8; nbytes];
        task.read_bytes_helper(p, &mut buf);
        match memchr::memchr(0, &buf) {
            Some(i) => {
                s.extend_from_slice(&buf[0..i]);
                // We scanned for the terminator ourselves.
                return unsafe { CString::from_vec_unchecked(s) };
            }
            None => {
                s.extend_from_slice(&buf);
                p = end_of_page;
            }
        }
    }
}
