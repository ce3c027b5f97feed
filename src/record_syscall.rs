use crate::arch::Architecture;
use crate::arch_structs::{
    __sysctl_args, _flock, accept4_args, accept_args, dqblk, dqinfo, epoll_event, ethtool_cmd,
    fd_set, flock64, f_owner_ex, getsockname_args, getsockopt_args, ifconf, ifreq, iovec,
    ipc_kludge_args, iwreq, mmap_args, mmsghdr, msghdr, msginfo, msqid64_ds, pollfd, recv_args,
    recvfrom_args, recvmmsg_args, recvmsg_args, rusage, select_args, sendmmsg_args, sendmsg_args,
    siginfo_t, socketpair_args, termios, timespec, timeval, user_desc, winsize,
};
use crate::address_space::kernel_mapping::{KernelMapping, MAP_FLAGS_MASK, NO_DEVICE, NO_INODE};
use crate::event::Switchable;
use crate::event::Switchable::{AllowSwitch, PreventSwitch};
use crate::flags::Flags;
use crate::kernel_abi::common::fcntl_operation;
use crate::kernel_abi::common::socklen_t;
use crate::kernel_abi::{
    CloneParameterOrdering, CloneTLSType, MmapCallingSemantics, SelectCallingSemantics,
    SupportedArch, RETRACE_NATIVE_ARCH,
};
use crate::kernel_metadata::{errno_name, syscall_name};
use crate::kernel_supplement::{
    ioc_dir, ioc_nr, ioc_size, ioc_type, ipc_call, socketcall, DRM_IOCTL_TYPE, FUTEX_CMD_MASK,
    FUTEX_CMP_REQUEUE, FUTEX_WAIT, FUTEX_WAIT_BITSET, FUTEX_WAKE, FUTEX_WAKE_OP, IOC_READ, IPC_64,
    PR_GET_ENDIAN, PR_GET_FPEMU, PR_GET_FPEXC, PR_GET_NAME, PR_GET_PDEATHSIG, PR_GET_TSC,
    PR_GET_UNALIGN, PR_SET_NAME, PR_SET_SECCOMP, SIOCETHTOOL, SIOCGIFADDR, SIOCGIFCONF,
    SIOCGIFFLAGS, SIOCGIFINDEX, SIOCGIFMTU, SIOCGIFNAME, SIOCGIWRATE, SUBCMDSHIFT, TCGETS,
    TIOCGWINSZ, TIOCINQ, UNIDENTIFIED_0X46_IOCTLS,
};
use crate::log::LogLevel::{LogDebug, LogWarn};
use crate::preload_interface::{syscallbuf_record, RETRACE_MAGIC_SAVE_DATA_FD};
use crate::registers::Registers;
use crate::remote_ptr::{RemotePtr, Void};
use crate::session::task::{read_mem, read_val_mem, read_c_str, Task};
use crate::trace::trace_task_event::TraceTaskEvent;
use crate::trace::trace_writer::RecordInTrace;
use crate::util::{ceil_page_size, is_blacklisted_filename, page_size, read_elf_class};
use goblin::elf::header::ELFCLASS64;
use libc::{pid_t, CLONE_UNTRACED, EINVAL, ENOENT, ENOSYS, MSG_DONTWAIT, PRIO_PROCESS};
use libc::{MAP_ANONYMOUS, MAP_GROWSDOWN, MAP_PRIVATE, PROT_EXEC, PROT_READ, PROT_WRITE};
use std::cell::RefCell;
use std::cmp::min;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::mem::size_of;
use std::os::unix::ffi::OsStringExt;

/// Offset of `field` within the tracee-side layout of `ty`, as an untyped
/// remote pointer based at `base`.
macro_rules! remote_ptr_field {
    ($base:expr, $ty:path, $field:ident) => {
        crate::remote_ptr::RemotePtr::<crate::remote_ptr::Void>::new_from_val(
            ($base).as_usize() + offset_of!($ty, $field),
        )
    };
}

/// Modes used to register syscall memory parameters with TaskSyscallState.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ArgMode {
    /// Syscall memory parameter is an in-parameter only.
    /// This is only important when we want to move the buffer to scratch memory
    /// so we can modify it without making the modifications potentially visible
    /// to user code. Otherwise, such parameters can be ignored.
    In,
    /// Syscall memory parameter is out-parameter only.
    Out,
    /// Syscall memory parameter is an in-out parameter.
    InOut,
    /// Syscall memory parameter is an in-out parameter but we must not use
    /// scratch (e.g. for futexes, we must use the actual memory word).
    InOutNoScratch,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WriteBack {
    WriteBack,
    NoWriteBack,
}

/// Specifies how to determine the size of a syscall memory
/// parameter. There is usually an incoming size determined before the syscall
/// executes (which we need in order to allocate scratch memory), combined
/// with an optional final size taken from the syscall result or a specific
/// memory location after the syscall has executed. The minimum of the
/// incoming and final sizes is used, if both are present.
#[derive(Copy, Clone)]
pub struct ParamSize {
    incoming_size: usize,
    /// If non-null, the size is limited by the value at this location after
    /// the syscall.
    mem_ptr: RemotePtr<Void>,
    /// Size of the value at mem_ptr or in the syscall result register.
    read_size: usize,
    /// When true, the size is limited by the value of the syscall result.
    from_syscall: bool,
}

impl ParamSize {
    pub fn new(incoming_size: usize) -> ParamSize {
        ParamSize {
            incoming_size,
            mem_ptr: RemotePtr::null(),
            read_size: 0,
            from_syscall: false,
        }
    }

    pub fn unbounded() -> ParamSize {
        ParamSize::new(usize::MAX)
    }

    /// The size is the value at `p` right now, but the kernel may shrink it;
    /// re-read `p` after the syscall and use the minimum.
    pub fn from_initialized_mem<T>(t: &mut dyn Task, p: RemotePtr<T>) -> ParamSize {
        let incoming = if p.is_null() {
            0
        } else {
            read_size_value(t, p.to_void(), size_of::<T>())
        };
        ParamSize {
            incoming_size: incoming,
            mem_ptr: p.to_void(),
            read_size: size_of::<T>(),
            from_syscall: false,
        }
    }

    /// The size is only known after the syscall, from the value at `p`.
    pub fn from_mem<T>(p: RemotePtr<T>) -> ParamSize {
        ParamSize {
            incoming_size: usize::MAX,
            mem_ptr: p.to_void(),
            read_size: size_of::<T>(),
            from_syscall: false,
        }
    }

    /// The size is the syscall's result register, read as a `T`.
    pub fn from_syscall_result<T>() -> ParamSize {
        ParamSize {
            incoming_size: usize::MAX,
            mem_ptr: RemotePtr::null(),
            read_size: size_of::<T>(),
            from_syscall: true,
        }
    }

    pub fn limit_size(&self, max: usize) -> ParamSize {
        let mut r = *self;
        r.incoming_size = min(r.incoming_size, max);
        r
    }

    /// Return true if 'other' takes its dynamic size from the same source as
    /// this.
    /// When multiple syscall memory parameters take their dynamic size from
    /// the same source, the source size is distributed among them, with the
    /// first registered parameter taking up to its max size, followed by the
    /// next, etc. This lets us efficiently record iovec buffers.
    pub fn is_same_source(&self, other: &ParamSize) -> bool {
        ((!self.mem_ptr.is_null() && other.mem_ptr == self.mem_ptr)
            || (self.from_syscall && other.from_syscall))
            && (self.read_size == other.read_size)
    }

    /// Compute the actual size after the syscall has executed.
    /// `already_consumed` bytes are subtracted from the dynamic part of the
    /// size.
    pub fn eval(&self, t: &mut dyn Task, already_consumed: usize) -> usize {
        let mut s = self.incoming_size;
        if !self.mem_ptr.is_null() {
            let mem_size = read_size_value(t, self.mem_ptr, self.read_size);
            ed_assert!(t, already_consumed <= mem_size);
            s = min(s, mem_size - already_consumed);
        }
        if self.from_syscall {
            let mut syscall_size = t.regs().syscall_result();
            syscall_size = match self.read_size {
                4 => syscall_size as u32 as usize,
                8 => syscall_size as u64 as usize,
                _ => {
                    ed_assert!(t, false, "Unknown read_size");
                    0
                }
            };
            ed_assert!(t, already_consumed <= syscall_size);
            s = min(s, syscall_size - already_consumed);
        }
        ed_assert!(t, s != usize::MAX);
        s
    }
}

fn read_size_value(t: &mut dyn Task, addr: RemotePtr<Void>, read_size: usize) -> usize {
    match read_size {
        4 => read_val_mem::<u32>(t, RemotePtr::cast(addr)) as usize,
        8 => read_val_mem::<u64>(t, RemotePtr::cast(addr)) as usize,
        _ => {
            ed_assert!(t, false, "Unknown read_size");
            0
        }
    }
}

/// Upon successful syscall completion, each registered parameter consumes
/// its bytes from the task's scratch buffer, copying the data to `dest` and
/// recording the data at `dest`. If `ptr_in_reg` is greater than zero, the
/// task's `ptr_in_reg` argument register is reset to `dest`. If
/// `ptr_in_memory` is non-null, the pointer at that location is reset to
/// `dest`.
struct MemoryParam {
    dest: RemotePtr<Void>,
    scratch: RemotePtr<Void>,
    num_bytes: ParamSize,
    ptr_in_memory: RemotePtr<Void>,
    ptr_in_reg: i32,
    mode: ArgMode,
}

/// When tasks enter syscalls that may block and so must be
/// prepared for a context-switch, and the syscall params
/// include (in)outparams that point to buffers, we need to
/// redirect those arguments to scratch memory.  This allows the
/// tracer to serialize execution of what may be multiple blocked
/// syscalls completing "simultaneously" (from the tracer's
/// perspective).  After the syscall exits, we restore the data
/// saved in scratch memory to the original buffers.
///
/// Then during replay, we simply restore the saved data to the
/// tracee's passed-in buffer args and continue on.
///
/// This is implemented by having rec_prepare_syscall_arch set up
/// a record in param_list for each syscall in-memory parameter (whether
/// "in" or "out"). Then done_preparing is called, which does the actual
/// scratch setup. process_syscall_results is called when the syscall is
/// done, to write back scratch results to the real parameters and
/// clean everything up.
///
/// ... a fly in this ointment is may-block buffered syscalls.
/// If a task blocks in one of those, it will look like it just
/// entered a syscall that needs a scratch buffer.  However,
/// it's too late at that point to fudge the syscall args,
/// because processing of the syscall has already begun in the
/// kernel.  But that's OK: the syscallbuf code has already
/// swapped out the original buffer-pointers for pointers into
/// the syscallbuf (which acts as its own scratch memory).  We
/// just have to worry about setting things up properly for
/// replay.
///
/// The descheduled syscall will "abort" its commit into the
/// syscallbuf, so the outparam data won't actually be saved
/// there (and thus, won't be restored during replay).  During
/// replay, we have to restore them like we restore the
/// non-buffered-syscall scratch data. This is done by recording
/// the relevant syscallbuf record data in rec_process_syscall_arch.
pub struct TaskSyscallState {
    param_list: Vec<MemoryParam>,
    /// Tracks the position in the task's scratch buffer where we should
    /// allocate the next scratch area.
    scratch: RemotePtr<Void>,

    /// The filename and argv captured at execve entry, written to the trace
    /// only once the exec succeeds.
    exec_saved_event: Option<Box<TraceTaskEvent>>,

    /// Saved syscall-entry registers, used by code paths that modify the
    /// registers temporarily.
    syscall_entry_registers: Option<Registers>,

    /// When nonzero, syscall is expected to return the given errno and we
    /// should die if it does not. This is set when we detect an error
    /// condition during syscall-enter preparation.
    expect_errno: i32,

    /// Records whether the syscall is switchable. Only valid when
    /// preparation_done is true.
    switchable: Switchable,

    /// When true, this syscall has already been prepared and should not
    /// be set up again.
    preparation_done: bool,

    /// When true, the scratch area is enabled, otherwise we're letting
    /// syscall outputs be written directly to their destinations.
    /// Only valid when preparation_done is true.
    scratch_enabled: bool,

    /// When true, we'll record the page of memory below the stack pointer.
    /// Some ioctls seem to modify this for no good reason.
    record_page_below_stack_ptr: bool,
}

// One in-flight syscall per task; entries live from the syscall-entry hook
// to the syscall-exit (or restart) hook. The record session drives exactly
// one tracee at a time, so a thread-local table needs no locking.
thread_local! {
    static SYSCALL_STATE_TABLE: RefCell<HashMap<pid_t, TaskSyscallState>> =
        RefCell::new(HashMap::new());
}

fn take_syscall_state(tid: pid_t) -> Option<TaskSyscallState> {
    SYSCALL_STATE_TABLE.with(|table| table.borrow_mut().remove(&tid))
}

fn store_syscall_state(tid: pid_t, state: TaskSyscallState) {
    SYSCALL_STATE_TABLE.with(|table| table.borrow_mut().insert(tid, state));
}

fn align_scratch(scratch: &mut RemotePtr<Void>) {
    *scratch = RemotePtr::new_from_val((scratch.as_usize() + 7) & !7usize);
}

fn get_remote_ptr(t: &mut dyn Task, addr: RemotePtr<Void>) -> RemotePtr<Void> {
    let val = match t.arch() {
        SupportedArch::X86 => read_val_mem::<u32>(t, RemotePtr::cast(addr)) as usize,
        SupportedArch::X64 => read_val_mem::<u64>(t, RemotePtr::cast(addr)) as usize,
    };
    RemotePtr::new_from_val(val)
}

fn set_remote_ptr(t: &mut dyn Task, addr: RemotePtr<Void>, value: RemotePtr<Void>) {
    match t.arch() {
        SupportedArch::X86 => {
            let val = value.as_usize() as u32;
            let buf = val.to_le_bytes();
            t.write_bytes_helper(addr, &buf);
        }
        SupportedArch::X64 => {
            let val = value.as_usize() as u64;
            let buf = val.to_le_bytes();
            t.write_bytes_helper(addr, &buf);
        }
    }
}

impl TaskSyscallState {
    fn new(t: &dyn Task) -> TaskSyscallState {
        TaskSyscallState {
            param_list: Vec::new(),
            scratch: t.scratch_ptr(),
            exec_saved_event: None,
            syscall_entry_registers: None,
            expect_errno: 0,
            switchable: PreventSwitch,
            preparation_done: false,
            scratch_enabled: false,
            record_page_below_stack_ptr: false,
        }
    }

    /// Identify a syscall memory parameter whose address is in register
    /// `arg` with size `size`.
    /// Returns the address of the data in the child (before scratch
    /// relocation) or null if parameters have already been prepared (the
    /// syscall is resuming).
    fn reg_parameter(
        &mut self,
        t: &mut dyn Task,
        arg: i32,
        size: ParamSize,
        mode: ArgMode,
    ) -> RemotePtr<Void> {
        if self.preparation_done {
            return RemotePtr::null();
        }

        let mut param = MemoryParam {
            dest: RemotePtr::new_from_val(t.regs().arg(arg)),
            scratch: RemotePtr::null(),
            num_bytes: size,
            ptr_in_memory: RemotePtr::null(),
            ptr_in_reg: 0,
            mode,
        };
        if param.dest.is_null() {
            return RemotePtr::null();
        }
        if mode != ArgMode::InOutNoScratch {
            param.scratch = self.scratch;
            self.scratch = self.scratch + param.num_bytes.incoming_size;
            align_scratch(&mut self.scratch);
            param.ptr_in_reg = arg;
        }
        let dest = param.dest;
        self.param_list.push(param);
        dest
    }

    /// Like `reg_parameter`, sized by `T`.
    fn reg_parameter_for<T>(&mut self, t: &mut dyn Task, arg: i32, mode: ArgMode) -> RemotePtr<T> {
        RemotePtr::cast(self.reg_parameter(t, arg, ParamSize::new(size_of::<T>()), mode))
    }

    /// Identify a syscall memory parameter whose address is in memory at
    /// location `addr_of_buf_ptr` with size `size`.
    /// Returns the address of the data in the child (before scratch
    /// relocation) or null if parameters have already been prepared.
    /// `addr_of_buf_ptr` must be in a buffer identified by a previous
    /// `reg_parameter`/`mem_ptr_parameter` call.
    fn mem_ptr_parameter(
        &mut self,
        t: &mut dyn Task,
        addr_of_buf_ptr: RemotePtr<Void>,
        size: ParamSize,
        mode: ArgMode,
    ) -> RemotePtr<Void> {
        if self.preparation_done || addr_of_buf_ptr.is_null() {
            return RemotePtr::null();
        }

        let mut param = MemoryParam {
            dest: get_remote_ptr(t, addr_of_buf_ptr),
            scratch: RemotePtr::null(),
            num_bytes: size,
            ptr_in_memory: RemotePtr::null(),
            ptr_in_reg: 0,
            mode,
        };
        if param.dest.is_null() {
            return RemotePtr::null();
        }
        if mode != ArgMode::InOutNoScratch {
            param.scratch = self.scratch;
            self.scratch = self.scratch + param.num_bytes.incoming_size;
            align_scratch(&mut self.scratch);
            param.ptr_in_memory = addr_of_buf_ptr;
        }
        let dest = param.dest;
        self.param_list.push(param);
        dest
    }

    /// Like `mem_ptr_parameter`, sized by `T`.
    fn mem_ptr_parameter_for<T>(
        &mut self,
        t: &mut dyn Task,
        addr_of_buf_ptr: RemotePtr<Void>,
        mode: ArgMode,
    ) -> RemotePtr<T> {
        RemotePtr::cast(self.mem_ptr_parameter(
            t,
            addr_of_buf_ptr,
            ParamSize::new(size_of::<T>()),
            mode,
        ))
    }

    /// Take `ptr`, an address within some registered memory parameter, and
    /// relocate it to the parameter's location in scratch memory.
    fn relocate_pointer_to_scratch(&self, t: &dyn Task, ptr: RemotePtr<Void>) -> RemotePtr<Void> {
        let mut num_relocations = 0;
        let mut result = RemotePtr::null();
        for param in &self.param_list {
            if param.dest <= ptr && ptr < param.dest + param.num_bytes.incoming_size {
                result = param.scratch + (ptr - param.dest);
                num_relocations += 1;
            }
        }
        ed_assert!(
            t,
            num_relocations > 0,
            "Pointer in non-scratch memory being updated to point to scratch?"
        );
        ed_assert!(
            t,
            num_relocations <= 1,
            "Overlapping buffers containing relocated pointer?"
        );
        result
    }

    /// Called when all memory parameters have been identified. If `sw` is
    /// AllowSwitch, sets up scratch memory and updates registers etc as
    /// necessary.
    /// If scratch can't be used for some reason, returns PreventSwitch,
    /// otherwise returns `sw`.
    fn done_preparing(&mut self, t: &mut dyn Task, sw: Switchable) -> Switchable {
        if self.preparation_done {
            return self.switchable;
        }
        self.preparation_done = true;

        let scratch_num_bytes = self.scratch - t.scratch_ptr();
        if sw == AllowSwitch && scratch_num_bytes > t.scratch_size() {
            log!(
                LogWarn,
                "`{}' needed a scratch buffer of size {}, but only {} was available. \
                 Disabling context switching: deadlock may follow.",
                syscall_name(t.current_syscall(), t.arch()),
                scratch_num_bytes,
                t.scratch_size()
            );
            self.switchable = PreventSwitch;
        } else {
            self.switchable = sw;
        }
        if self.switchable == PreventSwitch || self.param_list.is_empty() {
            return self.switchable;
        }

        self.scratch_enabled = true;

        // Step 1: Copy all IN/IN_OUT parameters to their scratch areas
        for i in 0..self.param_list.len() {
            let (dest, scratch, num_bytes, mode) = {
                let param = &self.param_list[i];
                (
                    param.dest,
                    param.scratch,
                    param.num_bytes.incoming_size,
                    param.mode,
                )
            };
            ed_assert!(t, num_bytes != usize::MAX);
            if mode == ArgMode::InOut || mode == ArgMode::In {
                // Initialize scratch buffer with input data
                t.remote_memcpy(scratch, dest, num_bytes);
            }
        }
        // Step 2: Update pointers in registers/memory to point to scratch areas
        let mut r = t.regs();
        for i in 0..self.param_list.len() {
            let (scratch, ptr_in_reg, ptr_in_memory, size_mem_ptr) = {
                let param = &self.param_list[i];
                (
                    param.scratch,
                    param.ptr_in_reg,
                    param.ptr_in_memory,
                    param.num_bytes.mem_ptr,
                )
            };
            if ptr_in_reg != 0 {
                r.set_arg(ptr_in_reg, scratch.as_usize());
            }
            if !ptr_in_memory.is_null() {
                // Pointers being relocated must themselves be in scratch
                // memory. We don't want to modify non-scratch memory. Find
                // the pointer's location in scratch memory.
                let p = self.relocate_pointer_to_scratch(t, ptr_in_memory);
                // Update pointer to point to scratch.
                // Note that this can only happen after step 1 is complete and
                // all parameter data has been copied to scratch memory.
                set_remote_ptr(t, p, scratch);
            }
            // If the number of bytes to record is coming from a memory
            // location, update that location to scratch.
            if !size_mem_ptr.is_null() {
                self.param_list[i].num_bytes.mem_ptr =
                    self.relocate_pointer_to_scratch(t, size_mem_ptr);
            }
        }
        t.set_regs(&r);
        self.switchable
    }

    /// Computes the actual size of parameter `i`, given the sizes already
    /// assigned to parameters before it: parameters sharing a dynamic size
    /// source split the source total in registration order.
    fn eval_param_size(
        &self,
        t: &mut dyn Task,
        i: usize,
        actual_sizes: &mut Vec<usize>,
    ) -> usize {
        debug_assert_eq!(actual_sizes.len(), i);

        let mut already_consumed = 0;
        for j in 0..i {
            if self.param_list[j]
                .num_bytes
                .is_same_source(&self.param_list[i].num_bytes)
            {
                already_consumed += actual_sizes[j];
            }
        }
        let size = self.param_list[i].num_bytes.eval(t, already_consumed);
        actual_sizes.push(size);
        size
    }

    /// Called when a syscall exits to copy results from scratch memory to
    /// their original destinations, update registers, and record the bytes
    /// the kernel produced. Pass NoWriteBack to indicate that the kernel did
    /// not write anything.
    fn process_syscall_results(&mut self, t: &mut dyn Task, write_back: WriteBack) {
        ed_assert!(t, self.preparation_done);

        // XXX what's the best way to handle failed syscalls? Currently we
        // just record everything as if it succeeded. That handles failed
        // syscalls that wrote partial results, but doesn't handle syscalls
        // that failed with EFAULT.
        let mut actual_sizes: Vec<usize> = Vec::new();
        if self.scratch_enabled {
            let scratch_num_bytes = self.scratch - t.scratch_ptr();
            let mut data = vec![0u8; scratch_num_bytes];
            t.read_bytes_helper(t.scratch_ptr(), &mut data);
            let mut r = t.regs();
            // Step 1: compute actual sizes of all buffers and copy outputs
            // from scratch back to their origin
            for i in 0..self.param_list.len() {
                let size = self.eval_param_size(t, i, &mut actual_sizes);
                let param = &self.param_list[i];
                if write_back == WriteBack::WriteBack
                    && (param.mode == ArgMode::InOut || param.mode == ArgMode::Out)
                {
                    let offset = param.scratch - t.scratch_ptr();
                    let (dest, slice) = (param.dest, &data[offset..offset + size]);
                    t.write_bytes_helper(dest, slice);
                }
            }
            let mut memory_cleaned_up = false;
            // Step 2: restore modified in-memory pointers and registers
            for i in 0..self.param_list.len() {
                let param = &self.param_list[i];
                if param.ptr_in_reg != 0 {
                    r.set_arg(param.ptr_in_reg, param.dest.as_usize());
                }
                if !param.ptr_in_memory.is_null() {
                    memory_cleaned_up = true;
                    let (addr, dest) = (param.ptr_in_memory, param.dest);
                    set_remote_ptr(t, addr, dest);
                }
            }
            if write_back == WriteBack::WriteBack {
                // Step 3: record all output memory areas
                for i in 0..self.param_list.len() {
                    let param = &self.param_list[i];
                    let size = actual_sizes[i];
                    if param.mode == ArgMode::InOutNoScratch {
                        t.record_remote(param.dest, size);
                    } else if param.mode == ArgMode::InOut || param.mode == ArgMode::Out {
                        // If pointers in memory were fixed up in step 2, then
                        // record from tracee memory to ensure we record such
                        // fixes. Otherwise we can record from our local data.
                        // XXX This optimization can be improved if necessary.
                        if memory_cleaned_up {
                            t.record_remote(param.dest, size);
                        } else {
                            let offset = param.scratch - t.scratch_ptr();
                            t.record_local(param.dest, &data[offset..offset + size]);
                        }
                    }
                }
            }
            t.set_regs(&r);
        } else {
            for i in 0..self.param_list.len() {
                let size = self.eval_param_size(t, i, &mut actual_sizes);
                let dest = self.param_list[i].dest;
                t.record_remote(dest, size);
            }
        }

        if self.record_page_below_stack_ptr {
            // Record the page above the top of the task's stack. The SIOC*
            // ioctls have been observed to write beyond the end of tracees'
            // stacks, as if they had allocated scratch space for themselves.
            // All we can do for now is try to record the scratch data.
            let below_sp = t.regs().sp() - page_size();
            t.record_remote(below_sp, page_size());
        }
    }
}

/// A write to the preload library's magic fd wants its buffer recorded
/// verbatim at syscall entry.
fn rec_before_record_syscall_entry_arch<Arch: Architecture>(t: &mut dyn Task, syscallno: i32) {
    if Arch::WRITE != syscallno {
        return;
    }
    let fd = t.regs().arg1_signed() as i32;
    if RETRACE_MAGIC_SAVE_DATA_FD != fd {
        return;
    }
    let buf: RemotePtr<Void> = RemotePtr::new_from_val(t.regs().arg2());
    let len = t.regs().arg3();

    ed_assert!(t, !buf.is_null(), "Can't save a null buffer");

    t.record_remote(buf, len);
}

pub fn rec_before_record_syscall_entry(t: &mut dyn Task, syscallno: i32) {
    rt_arch_function!(rec_before_record_syscall_entry_arch, t.arch(), t, syscallno)
}

fn prepare_recvmsg<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
    msgp: RemotePtr<msghdr<Arch>>,
    io_size: ParamSize,
) {
    let namelen_ptr: RemotePtr<socklen_t> =
        RemotePtr::cast(remote_ptr_field!(msgp, msghdr<Arch>, msg_namelen));
    let param_size = ParamSize::from_initialized_mem(t, namelen_ptr);
    syscall_state.mem_ptr_parameter(
        t,
        remote_ptr_field!(msgp, msghdr<Arch>, msg_name),
        param_size,
        ArgMode::Out,
    );

    let msg = read_val_mem::<msghdr<Arch>>(t, msgp);
    let iovlen: u64 = msg.msg_iovlen.into();
    let msg_iovlen = iovlen as usize;
    let iovecsp_void = syscall_state.mem_ptr_parameter(
        t,
        remote_ptr_field!(msgp, msghdr<Arch>, msg_iov),
        ParamSize::new(size_of::<iovec<Arch>>() * msg_iovlen),
        ArgMode::In,
    );
    let iovecsp: RemotePtr<iovec<Arch>> = RemotePtr::cast(iovecsp_void);
    let iovecs = read_mem(t, iovecsp, msg_iovlen);
    for i in 0..msg_iovlen {
        let iov_len: u64 = iovecs[i].iov_len.into();
        syscall_state.mem_ptr_parameter(
            t,
            remote_ptr_field!(iovecsp + i, iovec<Arch>, iov_base),
            io_size.limit_size(iov_len as usize),
            ArgMode::Out,
        );
    }

    let controllen_ptr: RemotePtr<Arch::size_t> =
        RemotePtr::cast(remote_ptr_field!(msgp, msghdr<Arch>, msg_controllen));
    let param_size = ParamSize::from_initialized_mem(t, controllen_ptr);
    syscall_state.mem_ptr_parameter(
        t,
        remote_ptr_field!(msgp, msghdr<Arch>, msg_control),
        param_size,
        ArgMode::Out,
    );
}

fn prepare_recvmmsg<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
    mmsgp: RemotePtr<mmsghdr<Arch>>,
    vlen: usize,
) {
    for i in 0..vlen {
        let msgp = mmsgp + i;
        let msg_len_ptr: RemotePtr<u32> =
            RemotePtr::cast(remote_ptr_field!(msgp, mmsghdr<Arch>, msg_len));
        prepare_recvmsg::<Arch>(
            t,
            syscall_state,
            RemotePtr::cast(remote_ptr_field!(msgp, mmsghdr<Arch>, msg_hdr)),
            ParamSize::from_mem(msg_len_ptr),
        );
    }
}

fn prepare_socketcall<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
) -> Switchable {
    // int socketcall(int call, unsigned long *args) {
    //   long a[6];
    //   copy_from_user(a,args);
    //   sys_recv(a0, (void __user *)a1, a[2], a[3]);
    // }
    match t.regs().arg1_signed() as i32 {
        // int socket(int domain, int type, int protocol);
        socketcall::SYS_SOCKET
        // int connect(int sockfd, const struct sockaddr *addr, socklen_t addrlen);
        | socketcall::SYS_CONNECT
        // int bind(int sockfd, const struct sockaddr *addr, socklen_t addrlen);
        | socketcall::SYS_BIND
        // int listen(int sockfd, int backlog)
        | socketcall::SYS_LISTEN
        // ssize_t send(int sockfd, const void *buf, size_t len, int flags)
        | socketcall::SYS_SEND
        // ssize_t sendto(int sockfd, const void *buf, size_t len, int flags,
        //                const struct sockaddr *dest_addr, socklen_t addrlen);
        | socketcall::SYS_SENDTO
        // int setsockopt(int sockfd, int level, int optname, const void *optval,
        //                socklen_t optlen);
        | socketcall::SYS_SETSOCKOPT
        // int shutdown(int socket, int how)
        | socketcall::SYS_SHUTDOWN => (),

        // int getsockopt(int sockfd, int level, int optname, const void *optval,
        //                socklen_t* optlen);
        socketcall::SYS_GETSOCKOPT => {
            let argsp: RemotePtr<getsockopt_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let optlen_ptr: RemotePtr<socklen_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, getsockopt_args<Arch>, optlen),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, optlen_ptr);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, getsockopt_args<Arch>, optval),
                param_size,
                ArgMode::Out,
            );
        }

        // int socketpair(int domain, int type, int protocol, int sv[2]);
        //
        // values returned in sv
        socketcall::SYS_SOCKETPAIR => {
            let argsp: RemotePtr<socketpair_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, socketpair_args<Arch>, sv),
                ParamSize::new(size_of::<i32>() * 2),
                ArgMode::Out,
            );
        }

        // int getpeername(int sockfd, struct sockaddr *addr, socklen_t *addrlen);
        // int getsockname(int sockfd, struct sockaddr *addr, socklen_t *addrlen);
        socketcall::SYS_GETPEERNAME | socketcall::SYS_GETSOCKNAME => {
            let argsp: RemotePtr<getsockname_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let addrlen_ptr: RemotePtr<socklen_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, getsockname_args<Arch>, addrlen),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, getsockname_args<Arch>, addr),
                param_size,
                ArgMode::Out,
            );
        }

        // ssize_t recv([int sockfd, void *buf, size_t len, int flags])
        socketcall::SYS_RECV => {
            let argsp: RemotePtr<recv_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let args = read_val_mem(t, argsp);
            let len: u64 = args.len.into();
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, recv_args<Arch>, buf),
                ParamSize::from_syscall_result::<Arch::ssize_t>().limit_size(len as usize),
                ArgMode::Out,
            );
            return syscall_state.done_preparing(t, AllowSwitch);
        }

        // int accept([int sockfd, struct sockaddr *addr, socklen_t *addrlen])
        socketcall::SYS_ACCEPT => {
            let argsp: RemotePtr<accept_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let addrlen_ptr: RemotePtr<socklen_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, accept_args<Arch>, addrlen),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, accept_args<Arch>, addr),
                param_size,
                ArgMode::Out,
            );
            return syscall_state.done_preparing(t, AllowSwitch);
        }

        // int accept4([int sockfd, struct sockaddr *addr, socklen_t *addrlen, int flags])
        socketcall::SYS_ACCEPT4 => {
            let argsp: RemotePtr<accept4_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let addrlen_ptr: RemotePtr<socklen_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, accept4_args<Arch>, addrlen),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, accept4_args<Arch>, addr),
                param_size,
                ArgMode::Out,
            );
            return syscall_state.done_preparing(t, AllowSwitch);
        }

        socketcall::SYS_RECVFROM => {
            let argsp: RemotePtr<recvfrom_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let args = read_val_mem(t, argsp);
            let len: u64 = args.len.into();
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, recvfrom_args<Arch>, buf),
                ParamSize::from_syscall_result::<Arch::ssize_t>().limit_size(len as usize),
                ArgMode::Out,
            );
            let addrlen_ptr: RemotePtr<socklen_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, recvfrom_args<Arch>, addrlen),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, recvfrom_args<Arch>, src_addr),
                param_size,
                ArgMode::Out,
            );
            return syscall_state.done_preparing(t, AllowSwitch);
        }

        socketcall::SYS_RECVMSG => {
            let argsp: RemotePtr<recvmsg_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let msgp: RemotePtr<msghdr<Arch>> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, recvmsg_args<Arch>, msg),
                ArgMode::InOut,
            );
            prepare_recvmsg::<Arch>(
                t,
                syscall_state,
                msgp,
                ParamSize::from_syscall_result::<Arch::ssize_t>(),
            );

            let args = read_val_mem(t, argsp);
            let flags: i64 = args.flags.into();
            if flags as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
        }

        socketcall::SYS_RECVMMSG => {
            let argsp: RemotePtr<recvmmsg_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let args = read_val_mem(t, argsp);
            let vlen_raw: u64 = args.vlen.into();
            let vlen = vlen_raw as usize;
            let mmsgp_void = syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, recvmmsg_args<Arch>, msgvec),
                ParamSize::new(size_of::<mmsghdr<Arch>>() * vlen),
                ArgMode::InOut,
            );
            let mmsgp: RemotePtr<mmsghdr<Arch>> = RemotePtr::cast(mmsgp_void);
            prepare_recvmmsg::<Arch>(t, syscall_state, mmsgp, vlen);
            let flags: u64 = args.flags.into();
            if flags as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
        }

        // ssize_t sendmsg(int sockfd, const struct msghdr *msg, int flags)
        socketcall::SYS_SENDMSG => {
            let argsp: RemotePtr<sendmsg_args<Arch>> =
                RemotePtr::new_from_val(t.regs().arg2());
            let args = read_val_mem(t, argsp);
            let flags: i64 = args.flags.into();
            if flags as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
        }

        socketcall::SYS_SENDMMSG => {
            let argsp: RemotePtr<sendmmsg_args<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::In);
            let args = read_val_mem(t, argsp);
            let vlen_raw: u64 = args.vlen.into();
            let vlen = vlen_raw as usize;
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, sendmmsg_args<Arch>, msgvec),
                ParamSize::new(size_of::<mmsghdr<Arch>>() * vlen),
                ArgMode::InOut,
            );
            let flags: u64 = args.flags.into();
            if flags as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
        }

        _ => {
            syscall_state.expect_errno = EINVAL;
        }
    }
    syscall_state.done_preparing(t, PreventSwitch)
}

fn prepare_msgctl<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
    cmd: i32,
    buf_ptr_reg: i32,
) -> Switchable {
    if cmd == libc::IPC_STAT as i32 || cmd == libc::MSG_STAT {
        syscall_state.reg_parameter_for::<msqid64_ds<Arch>>(t, buf_ptr_reg, ArgMode::Out);
    } else if cmd == libc::IPC_INFO as i32 || cmd == libc::MSG_INFO {
        syscall_state.reg_parameter_for::<msginfo>(t, buf_ptr_reg, ArgMode::Out);
    }
    syscall_state.done_preparing(t, PreventSwitch)
}

fn prepare_ioctl<Arch: Architecture>(t: &mut dyn Task, syscall_state: &mut TaskSyscallState) {
    let request = t.regs().arg2() as u32;
    let type_ = ioc_type(request);
    let nr = ioc_nr(request);
    let dir = ioc_dir(request);
    let size = ioc_size(request);

    log!(
        LogDebug,
        "handling ioctl({:#x}): type:{:#x} nr:{:#x} dir:{:#x} size:{}",
        request,
        type_,
        nr,
        dir,
        size
    );

    ed_assert!(
        t,
        !t.is_desched_event_syscall(),
        "Failed to skip past desched ioctl()"
    );

    // Some ioctl()s are irregular and don't follow the _IOC()
    // conventions. Special case them here.
    match request {
        SIOCETHTOOL => {
            let ifrp: RemotePtr<ifreq<Arch>> = syscall_state.reg_parameter_for(t, 3, ArgMode::In);
            syscall_state.mem_ptr_parameter_for::<ethtool_cmd>(
                t,
                remote_ptr_field!(ifrp, ifreq<Arch>, ifru_data),
                ArgMode::Out,
            );
            syscall_state.record_page_below_stack_ptr = true;
            return;
        }

        SIOCGIFCONF => {
            let ifconfp: RemotePtr<ifconf<Arch>> =
                syscall_state.reg_parameter_for(t, 3, ArgMode::Out);
            let ifc = read_val_mem(t, ifconfp);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(ifconfp, ifconf<Arch>, ifcu_buf),
                ParamSize::new(ifc.ifc_len as usize),
                ArgMode::Out,
            );
            syscall_state.record_page_below_stack_ptr = true;
            return;
        }

        SIOCGIFADDR | SIOCGIFFLAGS | SIOCGIFINDEX | SIOCGIFMTU | SIOCGIFNAME => {
            syscall_state.reg_parameter_for::<ifreq<Arch>>(t, 3, ArgMode::Out);
            syscall_state.record_page_below_stack_ptr = true;
            return;
        }

        SIOCGIWRATE => {
            // SIOCGIWRATE hasn't been observed to write beyond
            // tracees' stacks, but we record a stack page here
            // just in case the behavior is driver-dependent.
            syscall_state.reg_parameter_for::<iwreq>(t, 3, ArgMode::Out);
            syscall_state.record_page_below_stack_ptr = true;
            return;
        }

        TCGETS => {
            syscall_state.reg_parameter_for::<termios>(t, 3, ArgMode::Out);
            return;
        }

        TIOCINQ => {
            syscall_state.reg_parameter_for::<i32>(t, 3, ArgMode::Out);
            return;
        }

        TIOCGWINSZ => {
            syscall_state.reg_parameter_for::<winsize>(t, 3, ArgMode::Out);
            return;
        }

        _ => (),
    }

    // In ioctl language, "_IOC_READ" means "outparam". Both
    // READ and WRITE can be set for inout params.
    if IOC_READ & dir == 0 {
        // If the kernel isn't going to write any data back to
        // us, we hope and pray that the result of the ioctl
        // (observable to the tracee) is deterministic.
        log!(LogDebug, "  (deterministic ioctl, nothing to do)");
        return;
    }

    // The following ioctls are thought to be unknowable: we refuse to guess
    // what they write.
    if UNIDENTIFIED_0X46_IOCTLS.contains(&request) {
        fatal!("Unknown 0x46-series ioctl nr {:#x}", nr);
    }

    // The Direct Rendering Manager type (0x64, ASCII 'd'). At least one DRM
    // ioctl opens a file behind the tracer's back on behalf of the callee.
    // That wreaks havoc later on in execution, so the whole type is
    // off-limits until we can handle that behavior (by recording access to
    // shmem segments).
    if type_ == DRM_IOCTL_TYPE {
        fatal!("Intentionally unhandled DRM(0x64) ioctl nr {:#x}", nr);
    }

    t.regs().write_register_file(&mut std::io::stderr()).ok();
    ed_assert!(
        t,
        false,
        "Unknown ioctl({:#x}): type:{:#x} nr:{:#x} dir:{:#x} size:{} addr:{:#x}",
        request,
        type_,
        nr,
        dir,
        size,
        t.regs().arg3()
    );
}

/// Decide whether a tracee fd refers to the same open file as our own
/// stdout/stderr, via kcmp. On ENOSYS fall back to plain fd-number
/// equality; EBADF means the tracee passed a junk fd.
fn is_stdio_fd(t: &mut dyn Task, fd: i32) -> bool {
    for &tracer_fd in &[libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        match t.kcmp_file(tracer_fd, fd) {
            Ok(0) => return true,
            Ok(_) => (),
            Err(ENOSYS) => {
                return fd == libc::STDOUT_FILENO || fd == libc::STDERR_FILENO;
            }
            Err(libc::EBADF) => {
                // Tracees may try to write to invalid fds.
                return false;
            }
            Err(err) => {
                ed_assert!(t, false, "kcmp failed: {}", errno_name(err));
            }
        }
    }
    false
}

/// The task was descheduled while in a buffered syscall. We don't use
/// scratch memory for the call, because the syscallbuf itself is serving
/// that purpose. More importantly, we *can't* set up scratch for the task,
/// because it's already in the syscall. Instead, we will record the
/// syscallbuf memory in rec_process_syscall_arch.
///
/// Returns AllowSwitch if the syscall should be interruptible,
/// PreventSwitch otherwise.
fn prepare_deschedule<Arch: Architecture>(t: &mut dyn Task, syscallno: i32) -> Switchable {
    let rec_ptr = t.desched_rec().unwrap();
    let rec = read_val_mem(t, rec_ptr);
    ed_assert!(
        t,
        syscallno == rec.syscallno as i32,
        "Syscallbuf records syscall {}, but expecting {}",
        syscall_name(rec.syscallno as i32, t.arch()),
        syscall_name(syscallno, t.arch())
    );

    if syscallno == Arch::WRITE || syscallno == Arch::WRITEV {
        let fd = t.regs().arg1_signed() as i32;
        if is_stdio_fd(t, fd) {
            PreventSwitch
        } else {
            AllowSwitch
        }
    } else {
        AllowSwitch
    }
}

/// All this function does is reject 64-bit ELF binaries when we are a
/// 32-bit build. Everything else we (optimistically) indicate support for.
/// Missing or corrupt files will cause execve to fail normally.
fn exec_file_supported(file_name: &OsStr) -> bool {
    match RETRACE_NATIVE_ARCH {
        SupportedArch::X64 => true,
        SupportedArch::X86 => read_elf_class(file_name) != Some(ELFCLASS64),
    }
}

fn extract_clone_parameters<Arch: Architecture>(
    regs: &Registers,
) -> (RemotePtr<Void>, RemotePtr<Void>, RemotePtr<Void>) {
    let ptid = RemotePtr::new_from_val(regs.arg3());
    match Arch::CLONE_PARAMETER_ORDERING {
        CloneParameterOrdering::FlagsStackParentTLSChild => (
            ptid,
            RemotePtr::new_from_val(regs.arg4()),
            RemotePtr::new_from_val(regs.arg5()),
        ),
        CloneParameterOrdering::FlagsStackParentChildTLS => (
            ptid,
            RemotePtr::new_from_val(regs.arg5()),
            RemotePtr::new_from_val(regs.arg4()),
        ),
    }
}

fn rec_prepare_syscall_arch<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
) -> Switchable {
    let syscallno = t.current_syscall();

    match syscallno {
        s if s == Arch::SPLICE => {
            syscall_state.reg_parameter_for::<i64>(t, 2, ArgMode::InOut);
            syscall_state.reg_parameter_for::<i64>(t, 4, ArgMode::InOut);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::SENDFILE => {
            syscall_state.reg_parameter_for::<Arch::off_t>(t, 3, ArgMode::InOut);
            syscall_state.done_preparing(t, AllowSwitch)
        }
        s if s == Arch::SENDFILE64 => {
            syscall_state.reg_parameter_for::<i64>(t, 3, ArgMode::InOut);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::CLONE => {
            syscall_state.syscall_entry_registers = Some(t.regs());
            let flags = t.regs().arg1();
            if flags as i32 & CLONE_UNTRACED != 0 {
                let mut r = t.regs();
                // We can't let tracees clone untraced tasks,
                // because they can create nondeterminism that
                // we can't replay.  So unset the UNTRACED bit
                // and then cover our tracks on exit from
                // clone().
                r.set_arg1(flags & !(CLONE_UNTRACED as usize));
                t.set_regs(&r);
            }
            PreventSwitch
        }

        s if s == Arch::EXIT || s == Arch::EXIT_GROUP => {
            // Task teardown bookkeeping is the session's business; the
            // recording core just refuses to switch away mid-exit.
            PreventSwitch
        }

        s if s == Arch::EXECVE => {
            if syscall_state.syscall_entry_registers.is_none() {
                syscall_state.syscall_entry_registers = Some(t.regs());
            }

            t.pre_exec();

            let mut r = t.regs();
            let raw_filename = read_c_str(t, RemotePtr::new_from_val(r.arg1()));
            let end = r.arg1() + raw_filename.as_bytes().len();
            let filename = OsString::from_vec(raw_filename.into_bytes());
            if !exec_file_supported(&filename) {
                // Force exec to fail with ENOENT by advancing arg1 to
                // the null byte
                r.set_arg1(end);
                t.set_regs(&r);
            }

            let mut cmd_line: Vec<OsString> = Vec::new();
            let mut argv: RemotePtr<Arch::unsigned_word> = RemotePtr::new_from_val(r.arg2());
            loop {
                let p: u64 = read_val_mem(t, argv).into();
                if p == 0 {
                    break;
                }
                let arg = read_c_str(t, RemotePtr::new_from_val(p as usize));
                cmd_line.push(OsString::from_vec(arg.into_bytes()));
                argv = argv + 1;
            }

            // Save the event. We can't record it here because the exec might
            // fail.
            syscall_state.exec_saved_event = Some(Box::new(TraceTaskEvent::for_exec(
                t.tid(),
                &filename,
                cmd_line,
            )));

            PreventSwitch
        }

        s if s == Arch::FCNTL || s == Arch::FCNTL64 => {
            match t.regs().arg2() as u32 {
                fcntl_operation::DUPFD
                | fcntl_operation::GETFD
                | fcntl_operation::GETFL
                | fcntl_operation::SETFL
                | fcntl_operation::SETFD
                | fcntl_operation::SETLK
                | fcntl_operation::SETLK64
                | fcntl_operation::SETOWN
                | fcntl_operation::SETOWN_EX
                | fcntl_operation::SETSIG => (),

                fcntl_operation::GETLK => {
                    syscall_state.reg_parameter_for::<_flock<Arch>>(t, 3, ArgMode::InOut);
                }

                fcntl_operation::GETLK64 => {
                    // flock and flock64 better be different on 32-bit
                    // architectures, but on 64-bit architectures, it's OK if
                    // they're the same.
                    const_assert!(
                        size_of::<_flock<crate::arch::X86Arch>>()
                            < size_of::<flock64<crate::arch::X86Arch>>()
                    );
                    syscall_state.reg_parameter_for::<flock64<Arch>>(t, 3, ArgMode::InOut);
                }

                fcntl_operation::GETOWN_EX => {
                    syscall_state.reg_parameter_for::<f_owner_ex>(t, 3, ArgMode::Out);
                }

                fcntl_operation::SETLKW | fcntl_operation::SETLKW64 => {
                    // SETLKW blocks, but doesn't write any
                    // outparam data to the |struct flock|
                    // argument, so no need for scratch.
                    return syscall_state.done_preparing(t, AllowSwitch);
                }

                _ => {
                    // Unknown command should trigger EINVAL.
                    syscall_state.expect_errno = EINVAL;
                }
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        // int futex(int *uaddr, int op, int val, const struct timespec *timeout,
        //           int *uaddr2, int val3);
        // futex parameters are in-out but they can't be moved to scratch
        // addresses.
        s if s == Arch::FUTEX => {
            match t.regs().arg2_signed() as i32 & FUTEX_CMD_MASK {
                FUTEX_WAIT | FUTEX_WAIT_BITSET => {
                    syscall_state.reg_parameter_for::<i32>(t, 1, ArgMode::InOutNoScratch);
                    return syscall_state.done_preparing(t, AllowSwitch);
                }

                FUTEX_CMP_REQUEUE | FUTEX_WAKE_OP => {
                    syscall_state.reg_parameter_for::<i32>(t, 1, ArgMode::InOutNoScratch);
                    syscall_state.reg_parameter_for::<i32>(t, 5, ArgMode::InOutNoScratch);
                }

                FUTEX_WAKE => {
                    syscall_state.reg_parameter_for::<i32>(t, 1, ArgMode::InOutNoScratch);
                }

                _ => {
                    syscall_state.expect_errno = EINVAL;
                }
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::IPC => {
            match t.regs().arg1_signed() as i32 {
                ipc_call::MSGCTL => {
                    let cmd = t.regs().arg3_signed() as i32 & !IPC_64;
                    return prepare_msgctl::<Arch>(t, syscall_state, cmd, 5);
                }

                ipc_call::MSGGET => (),

                ipc_call::MSGSND => {
                    return syscall_state.done_preparing(t, AllowSwitch);
                }

                ipc_call::MSGRCV => {
                    let msgsize = t.regs().arg3();
                    let kluge_args: RemotePtr<ipc_kludge_args<Arch>> =
                        syscall_state.reg_parameter_for(t, 5, ArgMode::In);
                    syscall_state.mem_ptr_parameter(
                        t,
                        remote_ptr_field!(kluge_args, ipc_kludge_args<Arch>, msgbuf),
                        ParamSize::new(size_of::<Arch::signed_long>() + msgsize),
                        ArgMode::Out,
                    );
                    return syscall_state.done_preparing(t, AllowSwitch);
                }

                _ => {
                    syscall_state.expect_errno = EINVAL;
                }
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::MSGCTL => {
            let cmd = t.regs().arg2_signed() as i32 & !IPC_64;
            prepare_msgctl::<Arch>(t, syscall_state, cmd, 3)
        }

        s if s == Arch::MSGRCV => {
            let msgsize = t.regs().arg3();
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::new(size_of::<Arch::signed_long>() + msgsize),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::MSGSND => syscall_state.done_preparing(t, AllowSwitch),

        s if s == Arch::SOCKETCALL => prepare_socketcall::<Arch>(t, syscall_state),

        s if s == Arch::SELECT || s == Arch::_NEWSELECT => {
            if syscallno == Arch::SELECT
                && Arch::SELECT_SEMANTICS == SelectCallingSemantics::SelectStructArguments
            {
                let argsp: RemotePtr<select_args<Arch>> =
                    syscall_state.reg_parameter_for(t, 1, ArgMode::In);
                syscall_state.mem_ptr_parameter_for::<fd_set>(
                    t,
                    remote_ptr_field!(argsp, select_args<Arch>, read_fds),
                    ArgMode::InOut,
                );
                syscall_state.mem_ptr_parameter_for::<fd_set>(
                    t,
                    remote_ptr_field!(argsp, select_args<Arch>, write_fds),
                    ArgMode::InOut,
                );
                syscall_state.mem_ptr_parameter_for::<fd_set>(
                    t,
                    remote_ptr_field!(argsp, select_args<Arch>, except_fds),
                    ArgMode::InOut,
                );
                syscall_state.mem_ptr_parameter_for::<timeval<Arch>>(
                    t,
                    remote_ptr_field!(argsp, select_args<Arch>, timeout),
                    ArgMode::InOut,
                );
            } else {
                syscall_state.reg_parameter_for::<fd_set>(t, 2, ArgMode::InOut);
                syscall_state.reg_parameter_for::<fd_set>(t, 3, ArgMode::InOut);
                syscall_state.reg_parameter_for::<fd_set>(t, 4, ArgMode::InOut);
                syscall_state.reg_parameter_for::<timeval<Arch>>(t, 5, ArgMode::InOut);
            }
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::RECVFROM => {
            let buf_size = t.regs().arg3();
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::from_syscall_result::<Arch::ssize_t>().limit_size(buf_size),
                ArgMode::Out,
            );
            let addrlen_ptr =
                syscall_state.reg_parameter_for::<socklen_t>(t, 6, ArgMode::InOut);
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.reg_parameter(t, 5, param_size, ArgMode::Out);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::RECVMSG => {
            let msgp: RemotePtr<msghdr<Arch>> =
                syscall_state.reg_parameter_for(t, 2, ArgMode::InOut);
            prepare_recvmsg::<Arch>(
                t,
                syscall_state,
                msgp,
                ParamSize::from_syscall_result::<Arch::ssize_t>(),
            );
            if t.regs().arg3() as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::RECVMMSG => {
            let vlen = t.regs().arg3() as usize;
            let mmsgp_void = syscall_state.reg_parameter(
                t,
                2,
                ParamSize::new(size_of::<mmsghdr<Arch>>() * vlen),
                ArgMode::InOut,
            );
            let mmsgp: RemotePtr<mmsghdr<Arch>> = RemotePtr::cast(mmsgp_void);
            prepare_recvmmsg::<Arch>(t, syscall_state, mmsgp, vlen);
            if t.regs().arg4() as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::SENDMSG => {
            if t.regs().arg3() as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::SENDMMSG => {
            let vlen = t.regs().arg3() as usize;
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::new(size_of::<mmsghdr<Arch>>() * vlen),
                ArgMode::InOut,
            );
            if t.regs().arg4() as i32 & MSG_DONTWAIT == 0 {
                return syscall_state.done_preparing(t, AllowSwitch);
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::GETSOCKNAME || s == Arch::GETPEERNAME => {
            let addrlen_ptr =
                syscall_state.reg_parameter_for::<socklen_t>(t, 3, ArgMode::InOut);
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.reg_parameter(t, 2, param_size, ArgMode::Out);
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::GETSOCKOPT => {
            let optlen_ptr =
                syscall_state.reg_parameter_for::<socklen_t>(t, 5, ArgMode::InOut);
            let param_size = ParamSize::from_initialized_mem(t, optlen_ptr);
            syscall_state.reg_parameter(t, 4, param_size, ArgMode::Out);
            syscall_state.done_preparing(t, PreventSwitch)
        }

        // ssize_t read(int fd, void *buf, size_t count);
        s if s == Arch::READ || s == Arch::PREAD64 => {
            let count = t.regs().arg3();
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::from_syscall_result::<Arch::size_t>().limit_size(count),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::ACCEPT || s == Arch::ACCEPT4 => {
            let addrlen_ptr =
                syscall_state.reg_parameter_for::<socklen_t>(t, 3, ArgMode::InOut);
            let param_size = ParamSize::from_initialized_mem(t, addrlen_ptr);
            syscall_state.reg_parameter(t, 2, param_size, ArgMode::Out);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::GETCWD => {
            let buf_size = t.regs().arg2();
            syscall_state.reg_parameter(
                t,
                1,
                ParamSize::from_syscall_result::<Arch::ssize_t>().limit_size(buf_size),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::GETDENTS || s == Arch::GETDENTS64 => {
            let buf_size = t.regs().arg3();
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::from_syscall_result::<i32>().limit_size(buf_size),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::READLINK => {
            let buf_size = t.regs().arg3();
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::from_syscall_result::<Arch::ssize_t>().limit_size(buf_size),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::WRITE || s == Arch::WRITEV => {
            let fd = t.regs().arg1_signed() as i32;
            // Tracee writes to the tracer's stdout/stderr are echoed during
            // replay. We want to ensure that these writes are replayed in
            // the same order as they were performed during recording. If we
            // treat those writes as interruptible, we can get into a
            // difficult situation: we start the system call, it gets
            // interrupted, we switch to another thread that starts its own
            // write, and at that point we don't know which order the kernel
            // will actually perform the writes in.
            // We work around this problem by making writes to the tracer's
            // stdout/stderr non-interruptible. This theoretically
            // introduces the possibility of deadlock between the
            // tracee and some external program reading our output
            // via a pipe ... but that seems unlikely to bite in practice.
            //
            // Note that the determination of whether fd maps to our
            // stdout/stderr is exact, using kcmp, whereas the replayer's
            // decision to echo is a simple fd-number heuristic. That
            // asymmetry is known; resolving it needs per-fd metadata in
            // the replayer.
            if is_stdio_fd(t, fd) {
                PreventSwitch
            } else {
                AllowSwitch
            }
        }

        // ssize_t readv(int fd, const struct iovec *iov, int iovcnt);
        // ssize_t preadv(int fd, const struct iovec *iov, int iovcnt, off_t offset);
        s if s == Arch::READV || s == Arch::PREADV => {
            let iovcnt = t.regs().arg3_signed() as usize;
            let iovecsp_void = syscall_state.reg_parameter(
                t,
                2,
                ParamSize::new(size_of::<iovec<Arch>>() * iovcnt),
                ArgMode::In,
            );
            let iovecsp: RemotePtr<iovec<Arch>> = RemotePtr::cast(iovecsp_void);
            let iovecs = read_mem(t, iovecsp, iovcnt);
            let io_size = ParamSize::from_syscall_result::<Arch::size_t>();
            for i in 0..iovcnt {
                let iov_len: u64 = iovecs[i].iov_len.into();
                syscall_state.mem_ptr_parameter(
                    t,
                    remote_ptr_field!(iovecsp + i, iovec<Arch>, iov_base),
                    io_size.limit_size(iov_len as usize),
                    ArgMode::Out,
                );
            }
            syscall_state.done_preparing(t, AllowSwitch)
        }

        // pid_t waitpid(pid_t pid, int *status, int options);
        // pid_t wait4(pid_t pid, int *status, int options, struct rusage *rusage);
        s if s == Arch::WAITPID || s == Arch::WAIT4 => {
            syscall_state.reg_parameter_for::<i32>(t, 2, ArgMode::Out);
            if syscallno == Arch::WAIT4 {
                syscall_state.reg_parameter_for::<rusage<Arch>>(t, 4, ArgMode::Out);
            }
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::WAITID => {
            syscall_state.reg_parameter_for::<siginfo_t>(t, 3, ArgMode::Out);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::PAUSE => syscall_state.done_preparing(t, AllowSwitch),

        // int poll(struct pollfd *fds, nfds_t nfds, int timeout)
        // int ppoll(struct pollfd *fds, nfds_t nfds,
        //           const struct timespec *timeout_ts,
        //           const sigset_t *sigmask);
        s if s == Arch::POLL || s == Arch::PPOLL => {
            let nfds = t.regs().arg2();
            syscall_state.reg_parameter(
                t,
                1,
                ParamSize::new(size_of::<pollfd>() * nfds),
                ArgMode::InOut,
            );
            syscall_state.done_preparing(t, AllowSwitch)
        }

        // int prctl(int option, unsigned long arg2, unsigned long arg3,
        //           unsigned long arg4, unsigned long arg5);
        s if s == Arch::PRCTL => {
            match t.regs().arg1_signed() as i32 {
                PR_GET_ENDIAN | PR_GET_FPEMU | PR_GET_FPEXC | PR_GET_PDEATHSIG | PR_GET_TSC
                | PR_GET_UNALIGN => {
                    syscall_state.reg_parameter_for::<i32>(t, 2, ArgMode::Out);
                }

                PR_GET_NAME => {
                    syscall_state.reg_parameter(t, 2, ParamSize::new(16), ArgMode::Out);
                }

                PR_SET_NAME => {
                    let name = RemotePtr::new_from_val(t.regs().arg2());
                    t.update_prname(name);
                }

                PR_SET_SECCOMP => (),

                _ => {
                    syscall_state.expect_errno = EINVAL;
                }
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::IOCTL => {
            prepare_ioctl::<Arch>(t, syscall_state);
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::_SYSCTL => {
            let argsp: RemotePtr<__sysctl_args<Arch>> =
                syscall_state.reg_parameter_for(t, 1, ArgMode::In);
            let oldlenp: RemotePtr<Arch::size_t> = syscall_state.mem_ptr_parameter_for(
                t,
                remote_ptr_field!(argsp, __sysctl_args<Arch>, oldlenp),
                ArgMode::InOut,
            );
            let param_size = ParamSize::from_initialized_mem(t, oldlenp);
            syscall_state.mem_ptr_parameter(
                t,
                remote_ptr_field!(argsp, __sysctl_args<Arch>, oldval),
                param_size,
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::QUOTACTL => {
            match (t.regs().arg1() >> SUBCMDSHIFT) as i32 {
                cmd if cmd == libc::Q_GETQUOTA >> SUBCMDSHIFT => {
                    syscall_state.reg_parameter_for::<dqblk>(t, 4, ArgMode::Out);
                }
                cmd if cmd == libc::Q_GETINFO >> SUBCMDSHIFT => {
                    syscall_state.reg_parameter_for::<dqinfo>(t, 4, ArgMode::Out);
                }
                cmd if cmd == libc::Q_GETFMT >> SUBCMDSHIFT => {
                    syscall_state.reg_parameter_for::<i32>(t, 4, ArgMode::Out);
                }
                cmd if cmd == libc::Q_SETQUOTA >> SUBCMDSHIFT => {
                    fatal!(
                        "Trying to set disk quota usage, this may interfere with the recording"
                    );
                }
                cmd if cmd == libc::Q_QUOTAON >> SUBCMDSHIFT
                    || cmd == libc::Q_QUOTAOFF >> SUBCMDSHIFT
                    || cmd == libc::Q_SETINFO >> SUBCMDSHIFT
                    || cmd == libc::Q_SYNC >> SUBCMDSHIFT => (),
                _ => {
                    syscall_state.expect_errno = EINVAL;
                }
            }
            syscall_state.done_preparing(t, PreventSwitch)
        }

        // int epoll_wait(int epfd, struct epoll_event *events,
        //                int maxevents, int timeout);
        s if s == Arch::EPOLL_WAIT => {
            let maxevents = t.regs().arg3_signed() as usize;
            syscall_state.reg_parameter(
                t,
                2,
                ParamSize::new(size_of::<epoll_event>() * maxevents),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, AllowSwitch)
        }

        // The following two syscalls enable context switching not for
        // liveness/correctness reasons, but rather because if we
        // didn't context-switch away, we might end up busy-waiting
        // needlessly.  In addition, albeit far less likely, the
        // client program may have carefully optimized its own context
        // switching and we should take the hint.

        // int nanosleep(const struct timespec *req, struct timespec *rem);
        s if s == Arch::NANOSLEEP => {
            syscall_state.reg_parameter_for::<timespec<Arch>>(t, 2, ArgMode::Out);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::SCHED_YIELD => {
            // The task is pretending to block; the next time its scheduling
            // slot opens up it can be resumed normally.
            t.schedule_one_round_robin();
            AllowSwitch
        }

        s if s == Arch::RT_SIGPENDING => {
            let set_size = t.regs().arg2();
            syscall_state.reg_parameter(t, 1, ParamSize::new(set_size), ArgMode::Out);
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::RT_SIGTIMEDWAIT => {
            syscall_state.reg_parameter_for::<siginfo_t>(t, 2, ArgMode::Out);
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::RT_SIGSUSPEND || s == Arch::SIGSUSPEND => {
            let setp: RemotePtr<u64> = RemotePtr::new_from_val(t.regs().arg1());
            let sigs = read_val_mem(t, setp);
            t.set_sigsuspend_blocked_sigs(Some(sigs));
            syscall_state.done_preparing(t, AllowSwitch)
        }

        s if s == Arch::GETXATTR || s == Arch::LGETXATTR || s == Arch::FGETXATTR => {
            let value_size = t.regs().arg4();
            syscall_state.reg_parameter(
                t,
                3,
                ParamSize::from_syscall_result::<Arch::size_t>().limit_size(value_size),
                ArgMode::Out,
            );
            syscall_state.done_preparing(t, PreventSwitch)
        }

        s if s == Arch::SCHED_SETAFFINITY => {
            syscall_state.syscall_entry_registers = Some(t.regs());
            // Ignore all sched_setaffinity syscalls. They might interfere
            // with our own affinity settings.
            let mut r = t.regs();
            // Set arg1 to an invalid PID to ensure this syscall is ignored.
            r.set_arg1(usize::MAX);
            t.set_regs(&r);
            PreventSwitch
        }

        _ => PreventSwitch,
    }
}

pub fn rec_prepare_syscall(t: &mut dyn Task) -> Switchable {
    let mut syscall_state = match take_syscall_state(t.tid()) {
        Some(state) => state,
        None => TaskSyscallState::new(t),
    };
    let switchable = rec_prepare_syscall_inner(t, &mut syscall_state);
    store_syscall_state(t.tid(), syscall_state);
    switchable
}

fn rec_prepare_syscall_inner(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
) -> Switchable {
    let syscallno = t.current_syscall();

    if t.desched_rec().is_some() {
        return rt_arch_function!(prepare_deschedule, t.arch(), t, syscallno);
    }

    if syscallno < 0 {
        // Invalid syscall. Don't let it accidentally match a
        // syscall number below that's for an undefined syscall.
        return PreventSwitch;
    }

    rt_arch_function!(rec_prepare_syscall_arch, t.arch(), t, syscall_state)
}

fn rec_prepare_restart_syscall_arch<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
) {
    let syscallno = t.current_syscall();
    if syscallno == Arch::NANOSLEEP {
        // Hopefully uniquely among syscalls, nanosleep()
        // requires writing to its remaining-time outparam
        // *only if* the syscall fails with -EINTR.  When a
        // nanosleep() is interrupted by a signal, we don't
        // know a priori whether it's going to be eventually
        // restarted or not.  (Not easily, anyway.)  So we
        // don't know whether it will eventually return -EINTR
        // and would need the outparam written.  To resolve
        // that, we do what the kernel does, and update the
        // outparam at the -ERESTART_RESTARTBLOCK interruption
        // regardless.
        syscall_state.process_syscall_results(t, WriteBack::WriteBack);
    }
}

pub fn rec_prepare_restart_syscall(t: &mut dyn Task) {
    let maybe_state = take_syscall_state(t.tid());
    if let Some(mut syscall_state) = maybe_state {
        rt_arch_function!(rec_prepare_restart_syscall_arch, t.arch(), t, &mut syscall_state);
    }
    // State discarded; the restarted syscall will be prepared afresh.
}

/// Map a fresh private scratch region into the tracee and install it on the
/// task. Invoked on task birth and again after a successful execve, since
/// exec destroys the old address space.
pub fn init_scratch_memory(t: &mut dyn Task) {
    let scratch_size = Flags::get()
        .forced_scratch_size
        .unwrap_or(512 * page_size());
    let sz = scratch_size;
    // The PROT_EXEC looks scary, and it is, but it's to prevent
    // this region from being coalesced with another anonymous
    // segment mapped just after this one.  If we named this
    // segment, we could remove this hack.
    let prot = PROT_READ | PROT_WRITE | PROT_EXEC;
    let flags = MAP_PRIVATE | MAP_ANONYMOUS;
    // Initialize the scratchpad for blocking system calls.
    let scratch_ptr = t.infallible_mmap_syscall(RemotePtr::null(), sz, prot, flags, -1, 0);
    t.set_scratch(scratch_ptr, sz);

    // Record this mmap for the replay.
    let mut r = t.regs();
    let saved_result = r.syscall_result();
    r.set_syscall_result_from_remote_ptr(scratch_ptr);
    t.set_regs(&r);

    let filename = format!("scratch for thread {}", t.tid());
    let km = KernelMapping::new_with_opts(
        scratch_ptr,
        scratch_ptr + sz,
        &filename,
        NO_DEVICE,
        NO_INODE,
        prot,
        flags & MAP_FLAGS_MASK,
        0,
    );
    let record_in_trace = t.write_mapped_region(&km, prot, flags);
    ed_assert!(t, record_in_trace == RecordInTrace::DontRecordInTrace);

    r.set_syscall_result(saved_result);
    t.set_regs(&r);

    t.vm_map(&km);
}

fn process_execve<Arch: Architecture>(t: &mut dyn Task, syscall_state: &mut TaskSyscallState) {
    let mut r = t.regs();
    if r.syscall_failed() {
        let entry_arg1 = syscall_state
            .syscall_entry_registers
            .as_ref()
            .map(|er| er.arg1())
            .unwrap_or(0);
        if r.arg1() != entry_arg1 {
            log!(
                LogWarn,
                "Blocked attempt to execve a 64-bit image from a 32-bit tracer"
            );
            // Restore arg1, which we clobbered.
            r.set_arg1(entry_arg1);
            t.set_regs(&r);
        }
        return;
    }

    // The kernel clears the registers on a successful exec; a nonzero arg1
    // means we're not really looking at the post-exec state yet.
    if r.arg1() != 0 {
        return;
    }

    let event = syscall_state.exec_saved_event.take().unwrap();
    t.write_task_event(&event);

    t.post_exec_syscall();

    let mut stack_ptr: RemotePtr<Arch::unsigned_word> =
        RemotePtr::cast(t.regs().sp().to_void());

    // The stack pointer points at argc; skip over argv and its terminator.
    let argc: u64 = read_val_mem(t, stack_ptr).into();
    stack_ptr = stack_ptr + (argc as usize + 1);

    let null_ptr: u64 = read_val_mem(t, stack_ptr).into();
    ed_assert!(t, null_ptr == 0);
    stack_ptr = stack_ptr + 1;

    // Should now point to envp (pointer to environment strings).
    loop {
        let envp: u64 = read_val_mem(t, stack_ptr).into();
        if envp == 0 {
            break;
        }
        stack_ptr = stack_ptr + 1;
    }
    stack_ptr = stack_ptr + 1;
    // Should now point to the ELF Auxiliary Table.

    let ordering = Arch::ELF_AUXV_ORDERING;
    let entries = read_mem(t, stack_ptr, 2 * ordering.len());
    for (i, &expected_field) in ordering.iter().enumerate() {
        let key: u64 = entries[2 * i].into();
        ed_assert!(
            t,
            expected_field == key,
            "Elf aux entry {} should be {:#x}, but is {:#x}",
            i,
            expected_field,
            key
        );
    }
    stack_ptr = stack_ptr + 2 * ordering.len();

    let at_random: u64 = read_val_mem(t, stack_ptr).into();
    stack_ptr = stack_ptr + 1;
    ed_assert!(
        t,
        at_random == crate::kernel_supplement::AT_RANDOM,
        "ELF item should be {:#x}, but is {:#x}",
        crate::kernel_supplement::AT_RANDOM,
        at_random
    );

    // The kernel drops 16 bytes of randomness where AT_RANDOM points.
    let rand_val: u64 = read_val_mem(t, stack_ptr).into();
    let rand_addr = RemotePtr::new_from_val(rand_val as usize);
    t.record_remote(rand_addr, 16);

    init_scratch_memory(t);
}

fn process_mmap(
    t: &mut dyn Task,
    _syscallno: i32,
    length: usize,
    prot: i32,
    flags: i32,
    fd: i32,
    offset_pages: u64,
) {
    let size = ceil_page_size(length);
    let offset = offset_pages * 4096;

    if t.regs().syscall_failed() {
        // We purely emulate failed mmaps.
        return;
    }
    let addr: RemotePtr<Void> = RemotePtr::new_from_val(t.regs().syscall_result());
    if flags & MAP_ANONYMOUS != 0 {
        // Anonymous mappings are by definition not backed by any file-like
        // object, and are initialized to zero, so there's no nondeterminism
        // to record.
        let km = KernelMapping::new_with_opts(
            addr,
            addr + size,
            "",
            NO_DEVICE,
            NO_INODE,
            prot,
            flags & MAP_FLAGS_MASK,
            0,
        );
        t.vm_map(&km);
        return;
    }

    ed_assert!(t, fd >= 0, "Valid fd required for file mapping");
    ed_assert!(t, flags & MAP_GROWSDOWN == 0);

    let result = t.fstat(fd);
    let km = KernelMapping::new_with_opts(
        addr,
        addr + size,
        &result.file_name.to_string_lossy(),
        result.st.st_dev,
        result.st.st_ino,
        prot,
        flags & MAP_FLAGS_MASK,
        offset,
    );
    if t.write_mapped_region(&km, prot, flags) == RecordInTrace::RecordInTrace {
        let end = result.st.st_size as i64 - offset as i64;
        let num_bytes = min(end, size as i64);
        if num_bytes > 0 {
            t.record_remote(addr, num_bytes as usize);
        }
    }

    if prot & PROT_WRITE != 0 && flags & libc::MAP_SHARED != 0 {
        log!(
            LogWarn,
            "{:?} is SHARED|WRITEABLE; that's not handled correctly yet. \
             Optimistically hoping it's not written by programs outside the tracee tree.",
            result.file_name
        );
    }

    t.vm_map(&km);
}

fn before_syscall_exit<Arch: Architecture>(t: &mut dyn Task, syscallno: i32) {
    match syscallno {
        s if s == Arch::SETPRIORITY => {
            // The syscall might have failed due to insufficient
            // permissions (e.g. while trying to decrease the nice value
            // while not root).
            // We'll choose to honor the new value anyway since we'd like
            // to be able to test configurations where a child thread
            // has a lower nice value than its parent, which requires
            // lowering the child's nice value.
            if t.regs().arg1_signed() as i32 == PRIO_PROCESS as i32 {
                let tid = t.regs().arg2_signed() as pid_t;
                let priority = t.regs().arg3_signed() as i32;
                if tid == 0 || tid == t.tid() {
                    log!(
                        LogDebug,
                        "Setting nice value for tid {} to {}",
                        t.tid(),
                        priority
                    );
                    t.update_priority(priority);
                } else if let Some(target) = t.find_task(tid) {
                    log!(LogDebug, "Setting nice value for tid {} to {}", tid, priority);
                    target.borrow_mut().update_priority(priority);
                }
            }
        }

        s if s == Arch::SET_ROBUST_LIST => {
            let head = RemotePtr::new_from_val(t.regs().arg1());
            let len = t.regs().arg2();
            t.set_robust_list(head, len);
        }

        s if s == Arch::SET_THREAD_AREA => {
            let desc = RemotePtr::new_from_val(t.regs().arg1());
            t.set_thread_area(desc);
        }

        s if s == Arch::SET_TID_ADDRESS => {
            let addr = RemotePtr::new_from_val(t.regs().arg1());
            t.set_tid_addr(addr);
        }

        s if s == Arch::SIGACTION || s == Arch::RT_SIGACTION => {
            let r = t.regs();
            t.update_sigaction(&r);
        }

        s if s == Arch::SIGPROCMASK || s == Arch::RT_SIGPROCMASK => {
            let r = t.regs();
            t.update_sigmask(&r);
        }

        _ => (),
    }
}

fn check_syscall_rejected(t: &mut dyn Task) {
    // Invalid syscalls return -ENOSYS. Assume any such
    // result means the syscall was completely ignored by the
    // kernel so it's OK for us to not do anything special.
    // Other results mean we probably need to understand this
    // syscall, but we don't.
    if t.regs().syscall_result_signed() != -(ENOSYS as isize) {
        t.regs().write_register_file(&mut std::io::stderr()).ok();
        let syscallno = t.current_syscall();
        ed_assert!(
            t,
            false,
            "Unhandled syscall {}({}) returned {}",
            syscall_name(syscallno, t.arch()),
            syscallno,
            t.regs().syscall_result_signed()
        );
    }
}

fn process_clone<Arch: Architecture>(t: &mut dyn Task, syscall_state: &mut TaskSyscallState) {
    let new_tid = t.regs().syscall_result_signed() as pid_t;
    let flags = syscall_state
        .syscall_entry_registers
        .as_ref()
        .map(|er| er.arg1())
        .unwrap_or(0);

    if flags as i32 & CLONE_UNTRACED != 0 {
        let mut r = t.regs();
        r.set_arg1(flags);
        t.set_regs(&r);
    }

    if new_tid < 0 {
        return;
    }

    let new_task_ptr = t.find_task(new_tid);
    ed_assert!(t, new_task_ptr.is_some(), "Could not find cloned task {}", new_tid);
    let new_task_ptr = new_task_ptr.unwrap();
    let mut new_task = new_task_ptr.borrow_mut();

    new_task.push_syscall_event(t.current_syscall());

    // Record the child-id pointers of both parent and child. Presence of
    // these records must be preserved across record/replay even when the
    // pointers are null.
    let entry_regs = syscall_state.syscall_entry_registers.unwrap();
    let (parent_tid_in_parent, tls_in_parent, child_tid_in_parent) =
        extract_clone_parameters::<Arch>(&entry_regs);
    let child_regs = new_task.regs();
    let (parent_tid_in_child, tls_in_child, child_tid_in_child) =
        extract_clone_parameters::<Arch>(&child_regs);

    t.record_remote_even_if_null(parent_tid_in_parent, size_of::<pid_t>());

    match Arch::CLONE_TLS_TYPE {
        CloneTLSType::UserDescPointer => {
            t.record_remote_even_if_null(tls_in_parent, size_of::<user_desc>());
            new_task.record_remote_even_if_null(tls_in_child, size_of::<user_desc>());
        }
        CloneTLSType::PthreadStructurePointer => (),
    }
    new_task.record_remote_even_if_null(parent_tid_in_child, size_of::<pid_t>());
    new_task.record_remote_even_if_null(child_tid_in_child, size_of::<pid_t>());

    new_task.pop_syscall_event();

    let event = TraceTaskEvent::for_clone(new_tid, t.tid(), flags);
    t.write_task_event(&event);

    init_scratch_memory(&mut *new_task);
    // The new tracee just "finished" a clone that was started by its
    // parent. It has no pending events, so it can be context-switched out.
    new_task.set_switchable(AllowSwitch);
}

fn rec_process_syscall_arch<Arch: Architecture>(
    t: &mut dyn Task,
    syscall_state: &mut TaskSyscallState,
) {
    let syscallno = t.current_syscall();

    log!(
        LogDebug,
        "{}: processing: {}",
        t.tid(),
        syscall_name(syscallno, t.arch())
    );

    before_syscall_exit::<Arch>(t, syscallno);

    if let Some(rec_ptr) = t.desched_rec() {
        // If the syscallbuf has already been unmapped, there's no need to
        // record the entry.
        let rec = read_val_mem(t, rec_ptr);
        let extra_data_addr = rec_ptr.to_void() + size_of::<syscallbuf_record>();
        let mut extra_data = vec![0u8; rec.extra_data_size()];
        t.read_bytes_helper(extra_data_addr, &mut extra_data);
        t.record_local(extra_data_addr, &extra_data);
        return;
    }

    if syscallno < 0 {
        check_syscall_rejected(t);
        return;
    }

    if syscall_state.expect_errno != 0 {
        ed_assert!(
            t,
            t.regs().syscall_result_signed() == -(syscall_state.expect_errno as isize),
            "Expected {} for '{}' but got result {}",
            errno_name(syscall_state.expect_errno),
            syscall_name(syscallno, t.arch()),
            t.regs().syscall_result_signed()
        );
        return;
    }

    match syscallno {
        s if s == Arch::CLONE => {
            process_clone::<Arch>(t, syscall_state);
        }

        s if s == Arch::EXECVE => {
            process_execve::<Arch>(t, syscall_state);
        }

        s if s == Arch::MMAP => match Arch::MMAP_SEMANTICS {
            MmapCallingSemantics::StructArguments => {
                let argsp: RemotePtr<mmap_args<Arch>> =
                    RemotePtr::new_from_val(t.regs().arg1());
                let args = read_val_mem(t, argsp);
                let len: u64 = args.len.into();
                let prot: i64 = args.prot.into();
                let flags: i64 = args.flags.into();
                let fd: i64 = args.fd.into();
                let offset: i64 = args.offset.into();
                process_mmap(
                    t,
                    syscallno,
                    len as usize,
                    prot as i32,
                    flags as i32,
                    fd as i32,
                    (offset as u64) / 4096,
                );
            }
            MmapCallingSemantics::RegisterArguments => {
                let (len, prot, flags, fd, offset) = {
                    let r = t.regs();
                    (
                        r.arg2(),
                        r.arg3_signed() as i32,
                        r.arg4_signed() as i32,
                        r.arg5_signed() as i32,
                        r.arg6_signed() as i64,
                    )
                };
                process_mmap(t, syscallno, len, prot, flags, fd, (offset / 4096) as u64);
            }
        },

        s if s == Arch::MMAP2 => {
            let (len, prot, flags, fd, offset_pages) = {
                let r = t.regs();
                (
                    r.arg2(),
                    r.arg3_signed() as i32,
                    r.arg4_signed() as i32,
                    r.arg5_signed() as i32,
                    r.arg6_signed() as i64,
                )
            };
            process_mmap(t, syscallno, len, prot, flags, fd, offset_pages as u64);
        }

        s if s == Arch::NANOSLEEP => {
            // If the sleep completes, the kernel doesn't write back to the
            // remaining-time argument.
            let write_back = if t.regs().syscall_result_signed() != 0 {
                WriteBack::WriteBack
            } else {
                WriteBack::NoWriteBack
            };
            syscall_state.process_syscall_results(t, write_back);
        }

        s if s == Arch::OPEN => {
            let arg1 = t.regs().arg1();
            let pathname = read_c_str(t, RemotePtr::new_from_val(arg1));
            let pathname = OsString::from_vec(pathname.into_bytes());
            if is_blacklisted_filename(&pathname) {
                // NB: the file will still be open in the process's file
                // table, but let's hope this gross hack dies before we have
                // to worry about that.
                log!(LogWarn, "Cowardly refusing to open {:?}", pathname);
                let mut r = t.regs();
                r.set_syscall_result_signed(-(ENOENT as isize));
                t.set_regs(&r);
            }
        }

        s if s == Arch::_NEWSELECT
            || s == Arch::_SYSCTL
            || s == Arch::ACCEPT
            || s == Arch::ACCEPT4
            || s == Arch::EPOLL_WAIT
            || s == Arch::FCNTL
            || s == Arch::FCNTL64
            || s == Arch::FGETXATTR
            || s == Arch::FUTEX
            || s == Arch::GETCWD
            || s == Arch::GETDENTS
            || s == Arch::GETDENTS64
            || s == Arch::GETSOCKNAME
            || s == Arch::GETSOCKOPT
            || s == Arch::GETPEERNAME
            || s == Arch::GETXATTR
            || s == Arch::IOCTL
            || s == Arch::IPC
            || s == Arch::LGETXATTR
            || s == Arch::MSGCTL
            || s == Arch::MSGRCV
            || s == Arch::POLL
            || s == Arch::PPOLL
            || s == Arch::PRCTL
            || s == Arch::PREAD64
            || s == Arch::PREADV
            || s == Arch::QUOTACTL
            || s == Arch::READ
            || s == Arch::READLINK
            || s == Arch::READV
            || s == Arch::RECVFROM
            || s == Arch::RECVMSG
            || s == Arch::RECVMMSG
            || s == Arch::RT_SIGPENDING
            || s == Arch::RT_SIGTIMEDWAIT
            || s == Arch::SELECT
            || s == Arch::SENDFILE
            || s == Arch::SENDFILE64
            || s == Arch::SENDMMSG
            || s == Arch::SOCKETCALL
            || s == Arch::SPLICE
            || s == Arch::WAITID
            || s == Arch::WAITPID
            || s == Arch::WAIT4 =>
        {
            syscall_state.process_syscall_results(t, WriteBack::WriteBack);
        }

        s if s == Arch::WRITE || s == Arch::WRITEV => (),

        s if s == Arch::RT_SIGSUSPEND || s == Arch::SIGSUSPEND => {
            t.set_sigsuspend_blocked_sigs(None);
        }

        s if s == Arch::SCHED_SETAFFINITY => {
            // Restore the register that we altered.
            let mut r = t.regs();
            let entry_arg1 = syscall_state
                .syscall_entry_registers
                .as_ref()
                .map(|er| er.arg1())
                .unwrap_or(0);
            r.set_arg1(entry_arg1);
            // Pretend the syscall succeeded.
            r.set_syscall_result(0);
            t.set_regs(&r);
        }

        _ => {
            // Nothing to do: the syscall has no outparams we track, or it is
            // wholly handled by the session layer.
        }
    }
}

pub fn rec_process_syscall(t: &mut dyn Task) {
    let maybe_state = take_syscall_state(t.tid());
    ed_assert!(t, maybe_state.is_some(), "Syscall exit without entry state");
    let mut syscall_state = maybe_state.unwrap();
    rt_arch_function!(rec_process_syscall_arch, t.arch(), t, &mut syscall_state);
    // State is dropped here; the next syscall starts fresh.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{X64Arch, X86Arch};
    use crate::kernel_abi::{x64, x86};
    use crate::session::task::FileStat;
    use crate::session::task::TaskSharedPtr;
    use std::convert::TryInto;
    use std::mem::zeroed;

    const MEM_BASE: usize = 0x100000;
    const MEM_SIZE: usize = 0x200000;
    const SCRATCH_BASE: usize = MEM_BASE + 0x180000;
    const SCRATCH_CAP: usize = 0x10000;

    /// A tracee made of plain memory. Implements just enough of `Task` to
    /// drive the preparation/finalization engine end to end and observe what
    /// it records, restores and rewrites.
    struct MockTask {
        tid: pid_t,
        arch: SupportedArch,
        regs: Registers,
        mem: Vec<u8>,
        scratch_base: RemotePtr<Void>,
        scratch_cap: usize,
        current_syscall: i32,
        recorded: Vec<(usize, Vec<u8>)>,
        task_events: Vec<TraceTaskEvent>,
        mappings: Vec<String>,
        map_verdict: RecordInTrace,
        fstat_size: i64,
        prname: Option<usize>,
        robust_list: Option<(usize, usize)>,
        tid_addr: Option<usize>,
        thread_area: Option<usize>,
        sigactions_updated: u32,
        sigmask_updated: u32,
        sigsuspend_sigs: Option<u64>,
        priority: Option<i32>,
        yielded: bool,
        switchable_mark: Option<Switchable>,
        desched: Option<RemotePtr<syscallbuf_record>>,
        pre_execs: u32,
        post_execs: u32,
    }

    impl MockTask {
        fn new(arch: SupportedArch, syscallno: i32) -> MockTask {
            MockTask {
                tid: 1000,
                arch,
                regs: Registers::new(arch),
                mem: vec![0u8; MEM_SIZE],
                scratch_base: RemotePtr::new_from_val(SCRATCH_BASE),
                scratch_cap: SCRATCH_CAP,
                current_syscall: syscallno,
                recorded: Vec::new(),
                task_events: Vec::new(),
                mappings: Vec::new(),
                map_verdict: RecordInTrace::DontRecordInTrace,
                fstat_size: 0,
                prname: None,
                robust_list: None,
                tid_addr: None,
                thread_area: None,
                sigactions_updated: 0,
                sigmask_updated: 0,
                sigsuspend_sigs: None,
                priority: None,
                yielded: false,
                switchable_mark: None,
                desched: None,
                pre_execs: 0,
                post_execs: 0,
            }
        }

        fn in_range(&self, addr: usize, len: usize) -> bool {
            addr >= MEM_BASE && addr + len <= MEM_BASE + MEM_SIZE
        }

        fn poke(&mut self, addr: usize, bytes: &[u8]) {
            assert!(self.in_range(addr, bytes.len()));
            self.mem[addr - MEM_BASE..addr - MEM_BASE + bytes.len()].copy_from_slice(bytes);
        }

        fn poke_word(&mut self, addr: usize, val: u64) {
            match self.arch {
                SupportedArch::X86 => self.poke(addr, &(val as u32).to_le_bytes()),
                SupportedArch::X64 => self.poke(addr, &val.to_le_bytes()),
            }
        }

        fn peek(&self, addr: usize, len: usize) -> Vec<u8> {
            assert!(self.in_range(addr, len));
            self.mem[addr - MEM_BASE..addr - MEM_BASE + len].to_vec()
        }

        fn peek_word(&self, addr: usize) -> u64 {
            match self.arch {
                SupportedArch::X86 => {
                    u32::from_le_bytes(self.peek(addr, 4).try_into().unwrap()) as u64
                }
                SupportedArch::X64 => u64::from_le_bytes(self.peek(addr, 8).try_into().unwrap()),
            }
        }

        fn recorded_at(&self, addr: usize) -> Option<&Vec<u8>> {
            self.recorded.iter().find(|(a, _)| *a == addr).map(|(_, d)| d)
        }
    }

    impl Task for MockTask {
        fn tid(&self) -> pid_t {
            self.tid
        }
        fn arch(&self) -> SupportedArch {
            self.arch
        }
        fn current_syscall(&self) -> i32 {
            self.current_syscall
        }
        fn regs(&self) -> Registers {
            self.regs
        }
        fn set_regs(&mut self, regs: &Registers) {
            self.regs = *regs;
        }

        fn read_bytes_helper(&mut self, addr: RemotePtr<Void>, buf: &mut [u8]) {
            if self.in_range(addr.as_usize(), buf.len()) {
                let start = addr.as_usize() - MEM_BASE;
                buf.copy_from_slice(&self.mem[start..start + buf.len()]);
            } else {
                // Unmapped reads yield zeros; the engine tolerates reads
                // through null pointers on resumed-syscall paths.
                for b in buf.iter_mut() {
                    *b = 0;
                }
            }
        }

        fn write_bytes_helper(&mut self, addr: RemotePtr<Void>, buf: &[u8]) {
            let a = addr.as_usize();
            assert!(
                self.in_range(a, buf.len()),
                "write outside mock memory: {:#x}+{}",
                a,
                buf.len()
            );
            self.mem[a - MEM_BASE..a - MEM_BASE + buf.len()].copy_from_slice(buf);
        }

        fn scratch_ptr(&self) -> RemotePtr<Void> {
            self.scratch_base
        }
        fn scratch_size(&self) -> usize {
            self.scratch_cap
        }
        fn set_scratch(&mut self, ptr: RemotePtr<Void>, num_bytes: usize) {
            self.scratch_base = ptr;
            self.scratch_cap = num_bytes;
        }

        fn infallible_mmap_syscall(
            &mut self,
            _addr: RemotePtr<Void>,
            _length: usize,
            _prot: i32,
            _flags: i32,
            _fd: i32,
            _offset: u64,
        ) -> RemotePtr<Void> {
            RemotePtr::new_from_val(SCRATCH_BASE)
        }

        fn record_remote(&mut self, addr: RemotePtr<Void>, num_bytes: usize) {
            assert!(!addr.is_null(), "recording through a null pointer");
            let mut buf = vec![0u8; num_bytes];
            self.read_bytes_helper(addr, &mut buf);
            self.recorded.push((addr.as_usize(), buf));
        }

        fn record_remote_even_if_null(&mut self, addr: RemotePtr<Void>, num_bytes: usize) {
            if addr.is_null() {
                self.recorded.push((0, Vec::new()));
            } else {
                self.record_remote(addr, num_bytes);
            }
        }

        fn record_local(&mut self, addr: RemotePtr<Void>, buf: &[u8]) {
            self.recorded.push((addr.as_usize(), buf.to_vec()));
        }

        fn write_mapped_region(
            &mut self,
            map: &KernelMapping,
            _prot: i32,
            _flags: i32,
        ) -> RecordInTrace {
            self.mappings.push(map.fsname());
            self.map_verdict
        }

        fn write_task_event(&mut self, event: &TraceTaskEvent) {
            self.task_events.push(event.clone());
        }

        fn vm_map(&mut self, map: &KernelMapping) {
            self.mappings.push(map.fsname());
        }

        fn fstat(&mut self, _fd: i32) -> FileStat {
            let mut st: libc::stat = unsafe { zeroed() };
            st.st_dev = 1;
            st.st_ino = 42;
            st.st_size = self.fstat_size;
            FileStat {
                file_name: "/tmp/mockfile".into(),
                st,
            }
        }

        fn kcmp_file(&self, _tracer_fd: i32, _tracee_fd: i32) -> Result<i32, i32> {
            // The mock kernel predates kcmp; the engine must fall back to
            // fd-number comparison.
            Err(ENOSYS)
        }

        fn desched_rec(&self) -> Option<RemotePtr<syscallbuf_record>> {
            self.desched
        }
        fn is_desched_event_syscall(&self) -> bool {
            false
        }

        fn update_prname(&mut self, addr: RemotePtr<Void>) {
            self.prname = Some(addr.as_usize());
        }
        fn set_robust_list(&mut self, addr: RemotePtr<Void>, num_bytes: usize) {
            self.robust_list = Some((addr.as_usize(), num_bytes));
        }
        fn set_thread_area(&mut self, addr: RemotePtr<Void>) {
            self.thread_area = Some(addr.as_usize());
        }
        fn set_tid_addr(&mut self, addr: RemotePtr<Void>) {
            self.tid_addr = Some(addr.as_usize());
        }
        fn update_sigaction(&mut self, _regs: &Registers) {
            self.sigactions_updated += 1;
        }
        fn update_sigmask(&mut self, _regs: &Registers) {
            self.sigmask_updated += 1;
        }
        fn set_sigsuspend_blocked_sigs(&mut self, sigs: Option<u64>) {
            self.sigsuspend_sigs = sigs;
        }

        fn update_priority(&mut self, priority: i32) {
            self.priority = Some(priority);
        }
        fn schedule_one_round_robin(&mut self) {
            self.yielded = true;
        }
        fn set_switchable(&mut self, switchable: Switchable) {
            self.switchable_mark = Some(switchable);
        }

        fn find_task(&self, _tid: pid_t) -> Option<TaskSharedPtr> {
            None
        }

        fn push_syscall_event(&mut self, _syscallno: i32) {}
        fn pop_syscall_event(&mut self) {}

        fn pre_exec(&mut self) {
            self.pre_execs += 1;
        }
        fn post_exec_syscall(&mut self) {
            self.post_execs += 1;
        }
    }

    fn finish(t: &mut MockTask, result: isize) {
        let mut r = t.regs;
        r.set_syscall_result_signed(result);
        t.regs = r;
        rec_process_syscall(t);
    }

    #[test]
    fn read_redirects_to_scratch_and_records() {
        let buf = MEM_BASE + 0x3000;
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        t.regs.set_arg1(7);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(4096);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        // The buffer argument now points into scratch.
        let scratch_buf = t.regs.arg2();
        assert_eq!(SCRATCH_BASE, scratch_buf);

        // The "kernel" reads 100 bytes into the scratch buffer.
        let payload: Vec<u8> = (0..100u8).collect();
        t.poke(scratch_buf, &payload);
        finish(&mut t, 100);

        // Bytes were copied back to the original buffer, recorded there, and
        // the argument register was restored.
        assert_eq!(payload, t.peek(buf, 100));
        assert_eq!(Some(&payload), t.recorded_at(buf));
        assert_eq!(buf, t.regs.arg2());
    }

    #[test]
    fn read_on_x86_uses_32_bit_registers() {
        let buf = MEM_BASE + 0x3000;
        let mut t = MockTask::new(SupportedArch::X86, x86::READ);
        t.regs.set_arg1(7);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(64);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        assert_eq!(SCRATCH_BASE, t.regs.arg2());

        let payload = vec![0x5au8; 33];
        t.poke(SCRATCH_BASE, &payload);
        finish(&mut t, 33);

        assert_eq!(payload, t.peek(buf, 33));
        assert_eq!(buf, t.regs.arg2());
    }

    #[test]
    fn prepare_is_idempotent_across_resume() {
        let buf = MEM_BASE + 0x3000;
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        t.regs.set_arg1(7);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(256);

        let first = rec_prepare_syscall(&mut t);
        // Resuming the same syscall runs the descriptor code again; it must
        // not register duplicate parameters or change the decision.
        let second = rec_prepare_syscall(&mut t);
        assert_eq!(first, second);

        t.poke(SCRATCH_BASE, &[7u8; 16]);
        finish(&mut t, 16);
        assert_eq!(1, t.recorded.len());
        assert_eq!(Some(&vec![7u8; 16]), t.recorded_at(buf));
    }

    #[test]
    fn scratch_exhaustion_degrades_switchability() {
        let buf = MEM_BASE + 0x3000;
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        t.scratch_cap = 128;
        t.regs.set_arg1(7);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(4096);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        // Scratch was not enabled: the buffer argument is untouched.
        assert_eq!(buf, t.regs.arg2());

        // The kernel wrote straight to the destination.
        t.poke(buf, &[9u8; 50]);
        finish(&mut t, 50);
        assert_eq!(Some(&vec![9u8; 50]), t.recorded_at(buf));
    }

    #[test]
    fn recvmsg_distributes_result_across_iovecs() {
        let msgp = MEM_BASE + 0x1000;
        let iovp = MEM_BASE + 0x2000;
        let buf0 = MEM_BASE + 0x3000;
        let buf1 = MEM_BASE + 0x4000;
        let mut t = MockTask::new(SupportedArch::X64, x64::RECVMSG);

        let iov_size = size_of::<iovec<X64Arch>>();
        let base_off = offset_of!(iovec<X64Arch>, iov_base);
        let len_off = offset_of!(iovec<X64Arch>, iov_len);
        t.poke_word(iovp + base_off, buf0 as u64);
        t.poke_word(iovp + len_off, 10);
        t.poke_word(iovp + iov_size + base_off, buf1 as u64);
        t.poke_word(iovp + iov_size + len_off, 20);

        let iov_field = offset_of!(msghdr<X64Arch>, msg_iov);
        let iovlen_field = offset_of!(msghdr<X64Arch>, msg_iovlen);
        t.poke_word(msgp + iov_field, iovp as u64);
        t.poke_word(msgp + iovlen_field, 2);

        t.regs.set_arg1(5);
        t.regs.set_arg2(msgp);
        t.regs.set_arg3(0);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));

        // Follow the relocated pointers: msghdr, then its iov array, then
        // the two scatter buffers, all in scratch now.
        let scratch_msg = t.regs.arg2();
        assert_ne!(msgp, scratch_msg);
        let scratch_iov = t.peek_word(scratch_msg + iov_field) as usize;
        assert_ne!(iovp, scratch_iov);
        let scratch_buf0 = t.peek_word(scratch_iov + base_off) as usize;
        let scratch_buf1 = t.peek_word(scratch_iov + iov_size + base_off) as usize;

        t.poke(scratch_buf0, &[0xaa; 10]);
        t.poke(scratch_buf1, &[0xbb; 5]);
        finish(&mut t, 15);

        // 15 bytes split prefix-greedily: 10 to the first iovec, 5 to the
        // second.
        assert_eq!(vec![0xaa; 10], t.peek(buf0, 10));
        assert_eq!(vec![0xbb; 5], t.peek(buf1, 5));
        assert_eq!(Some(&vec![0xaa; 10]), t.recorded_at(buf0));
        assert_eq!(Some(&vec![0xbb; 5]), t.recorded_at(buf1));

        // The in-memory indirections were restored to their originals.
        assert_eq!(iovp as u64, t.peek_word(msgp + iov_field));
        assert_eq!(buf0 as u64, t.peek_word(iovp + base_off));
        assert_eq!(msgp, t.regs.arg2());
    }

    #[test]
    fn accept4_sizes_addr_from_addrlen() {
        let addr = MEM_BASE + 0x3000;
        let addrlenp = MEM_BASE + 0x4000;
        let mut t = MockTask::new(SupportedArch::X64, x64::ACCEPT4);
        t.poke(addrlenp, &16u32.to_le_bytes());
        t.regs.set_arg1(4);
        t.regs.set_arg2(addr);
        t.regs.set_arg3(addrlenp);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        let scratch_addrlen = t.regs.arg3();
        let scratch_addr = t.regs.arg2();

        // The kernel wrote an 8-byte address and shrank *addrlen to 8.
        t.poke(scratch_addrlen, &8u32.to_le_bytes());
        t.poke(scratch_addr, &[0xcd; 8]);
        finish(&mut t, 9);

        assert_eq!(vec![0xcd; 8], t.peek(addr, 8));
        assert_eq!(8, u32::from_le_bytes(t.peek(addrlenp, 4).try_into().unwrap()));
        assert_eq!(Some(&vec![0xcd; 8]), t.recorded_at(addr));
        assert_eq!(Some(&8u32.to_le_bytes().to_vec()), t.recorded_at(addrlenp));
        assert_eq!(addr, t.regs.arg2());
        assert_eq!(addrlenp, t.regs.arg3());
    }

    #[test]
    fn futex_wait_leaves_word_in_place() {
        let uaddr = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::FUTEX);
        t.poke(uaddr, &42u32.to_le_bytes());
        t.regs.set_arg1(uaddr);
        t.regs.set_arg2((FUTEX_WAIT | crate::kernel_supplement::FUTEX_PRIVATE_FLAG) as usize);
        t.regs.set_arg3(42);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        // No scratch relocation: address identity matters for futexes.
        assert_eq!(uaddr, t.regs.arg1());

        finish(&mut t, 0);
        assert_eq!(Some(&42u32.to_le_bytes().to_vec()), t.recorded_at(uaddr));
    }

    #[test]
    fn siocgifconf_records_buffer_and_stack_page() {
        let ifconfp = MEM_BASE + 0x1000;
        let buf = MEM_BASE + 0x2000;
        let sp = MEM_BASE + 0x80000;
        let mut t = MockTask::new(SupportedArch::X64, x64::IOCTL);
        t.poke(ifconfp, &64i32.to_le_bytes());
        let buf_field = offset_of!(ifconf<X64Arch>, ifcu_buf);
        t.poke_word(ifconfp + buf_field, buf as u64);
        t.regs.set_arg1(3);
        t.regs.set_arg2(SIOCGIFCONF as usize);
        t.regs.set_arg3(ifconfp);
        t.regs.set_sp(RemotePtr::new_from_val(sp));

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 0);

        assert!(t.recorded_at(ifconfp).is_some());
        assert_eq!(64, t.recorded_at(buf).unwrap().len());
        let ps = page_size();
        assert_eq!(ps, t.recorded_at(sp - ps).unwrap().len());
    }

    #[test]
    fn unknown_fcntl_command_is_tolerated_when_kernel_rejects_it() {
        let mut t = MockTask::new(SupportedArch::X64, x64::FCNTL);
        t.regs.set_arg1(3);
        t.regs.set_arg2(0x7fff);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        // The kernel agrees this command is bogus; finalization must accept
        // the EINVAL and record nothing.
        finish(&mut t, -(EINVAL as isize));
        assert!(t.recorded.is_empty());
    }

    #[test]
    fn nanosleep_writes_rem_only_on_interruption() {
        let rem = MEM_BASE + 0x1000;

        // Completed sleep: the kernel does not touch rem.
        let mut t = MockTask::new(SupportedArch::X64, x64::NANOSLEEP);
        t.regs.set_arg1(MEM_BASE + 0x2000);
        t.regs.set_arg2(rem);
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 0);
        assert!(t.recorded.is_empty());
        assert_eq!(rem, t.regs.arg2());

        // Interrupted sleep: the remaining time is written back and
        // recorded.
        let mut t = MockTask::new(SupportedArch::X64, x64::NANOSLEEP);
        t.regs.set_arg1(MEM_BASE + 0x2000);
        t.regs.set_arg2(rem);
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        let scratch_rem = t.regs.arg2();
        t.poke(scratch_rem, &[3u8; 16]);
        finish(&mut t, -(libc::EINTR as isize));
        assert_eq!(vec![3u8; 16], t.peek(rem, 16));
        assert_eq!(Some(&vec![3u8; 16]), t.recorded_at(rem));
    }

    #[test]
    fn writes_to_tracer_stdio_are_not_switchable() {
        let mut t = MockTask::new(SupportedArch::X64, x64::WRITE);
        t.regs.set_arg1(1);
        t.regs.set_arg2(MEM_BASE + 0x1000);
        t.regs.set_arg3(10);
        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 10);

        let mut t = MockTask::new(SupportedArch::X64, x64::WRITE);
        t.regs.set_arg1(5);
        t.regs.set_arg2(MEM_BASE + 0x1000);
        t.regs.set_arg3(10);
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 10);
    }

    #[test]
    fn sched_setaffinity_is_neutered() {
        let mut t = MockTask::new(SupportedArch::X64, x64::SCHED_SETAFFINITY);
        t.regs.set_arg1(1234);
        t.regs.set_arg2(8);
        t.regs.set_arg3(MEM_BASE + 0x1000);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        // arg1 was replaced with an invalid pid so the kernel rejects the
        // call.
        assert_eq!(usize::MAX, t.regs.arg1());

        finish(&mut t, -(libc::ESRCH as isize));
        assert_eq!(1234, t.regs.arg1());
        assert_eq!(0, t.regs.syscall_result());
    }

    #[test]
    fn clone_untraced_flag_is_scrubbed_and_restored() {
        let flags = (CLONE_UNTRACED | libc::CLONE_VM) as usize;
        let mut t = MockTask::new(SupportedArch::X64, x64::CLONE);
        t.regs.set_arg1(flags);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        assert_eq!(0, t.regs.arg1() & CLONE_UNTRACED as usize);

        // The clone failed; the flag word must still be restored so
        // userspace sees what it passed in.
        finish(&mut t, -(libc::EAGAIN as isize));
        assert_eq!(flags, t.regs.arg1());
        assert!(t.task_events.is_empty());
    }

    #[test]
    fn anonymous_mmap_registers_mapping_without_recording() {
        let mut t = MockTask::new(SupportedArch::X64, x64::MMAP);
        t.regs.set_arg2(0x2000);
        t.regs.set_arg3(PROT_READ as usize);
        t.regs.set_arg4((MAP_PRIVATE | MAP_ANONYMOUS) as usize);
        t.regs.set_arg5(-1i64 as usize);
        t.regs.set_arg6(0);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, (MEM_BASE + 0x50000) as isize);

        assert_eq!(1, t.mappings.len());
        assert!(t.recorded.is_empty());
    }

    #[test]
    fn file_mmap_records_file_bytes_when_writer_asks() {
        let map_addr = MEM_BASE + 0x60000;
        let mut t = MockTask::new(SupportedArch::X64, x64::MMAP);
        t.map_verdict = RecordInTrace::RecordInTrace;
        t.fstat_size = 0x1800;
        t.regs.set_arg2(0x2000);
        t.regs.set_arg3(PROT_READ as usize);
        t.regs.set_arg4(MAP_PRIVATE as usize);
        t.regs.set_arg5(3);
        t.regs.set_arg6(0);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, map_addr as isize);

        // Only the bytes actually backed by the file are recorded.
        assert_eq!(0x1800, t.recorded_at(map_addr).unwrap().len());
        assert!(t.mappings.iter().any(|m| m == "/tmp/mockfile"));
    }

    #[test]
    fn failed_mmap_is_ignored() {
        let mut t = MockTask::new(SupportedArch::X64, x64::MMAP);
        t.regs.set_arg2(0x2000);
        t.regs.set_arg3(PROT_READ as usize);
        t.regs.set_arg4(MAP_PRIVATE as usize);
        t.regs.set_arg5(3);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, -(libc::ENOMEM as isize));
        assert!(t.mappings.is_empty());
        assert!(t.recorded.is_empty());
    }

    #[test]
    fn blacklisted_open_is_rewritten_to_enoent() {
        let path = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::OPEN);
        t.poke(path, b"/dev/nvidiactl\0");
        t.regs.set_arg1(path);

        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 3);
        assert_eq!(-(ENOENT as isize), t.regs.syscall_result_signed());
    }

    #[test]
    fn exit_hooks_update_task_mirrors() {
        let mut t = MockTask::new(SupportedArch::X64, x64::SET_ROBUST_LIST);
        t.regs.set_arg1(MEM_BASE + 0x5000);
        t.regs.set_arg2(24);
        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 0);
        assert_eq!(Some((MEM_BASE + 0x5000, 24)), t.robust_list);

        let mut t = MockTask::new(SupportedArch::X64, x64::SET_TID_ADDRESS);
        t.regs.set_arg1(MEM_BASE + 0x6000);
        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        let tid = t.tid;
        finish(&mut t, tid as isize);
        assert_eq!(Some(MEM_BASE + 0x6000), t.tid_addr);

        let mut t = MockTask::new(SupportedArch::X64, x64::RT_SIGACTION);
        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, 0);
        assert_eq!(1, t.sigactions_updated);
    }

    #[test]
    fn setpriority_updates_scheduler_even_on_failure() {
        let mut t = MockTask::new(SupportedArch::X64, x64::SETPRIORITY);
        t.regs.set_arg1(PRIO_PROCESS as usize);
        t.regs.set_arg2(0);
        t.regs.set_arg3(15);
        assert_eq!(PreventSwitch, rec_prepare_syscall(&mut t));
        finish(&mut t, -(libc::EACCES as isize));
        assert_eq!(Some(15), t.priority);
    }

    #[test]
    fn sigsuspend_mirrors_blocked_set_for_the_duration() {
        let setp = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::RT_SIGSUSPEND);
        t.poke(setp, &0xdead_beefu64.to_le_bytes());
        t.regs.set_arg1(setp);

        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        assert_eq!(Some(0xdead_beef), t.sigsuspend_sigs);

        finish(&mut t, -(libc::EINTR as isize));
        assert_eq!(None, t.sigsuspend_sigs);
    }

    #[test]
    fn sched_yield_pokes_the_scheduler() {
        let mut t = MockTask::new(SupportedArch::X64, x64::SCHED_YIELD);
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        assert!(t.yielded);
        finish(&mut t, 0);
    }

    #[test]
    fn magic_fd_write_is_saved_at_entry() {
        let buf = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::WRITE);
        t.poke(buf, &[1, 2, 3, 4, 5, 6, 7, 8]);
        t.regs.set_arg1(RETRACE_MAGIC_SAVE_DATA_FD as usize);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(8);

        rec_before_record_syscall_entry(&mut t, x64::WRITE);
        assert_eq!(Some(&vec![1, 2, 3, 4, 5, 6, 7, 8]), t.recorded_at(buf));
    }

    #[test]
    fn param_size_splits_a_shared_source_prefix_greedily() {
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        t.regs.set_syscall_result(15);
        let a = ParamSize::from_syscall_result::<i64>().limit_size(10);
        let b = ParamSize::from_syscall_result::<i64>().limit_size(20);
        assert!(a.is_same_source(&b));
        assert_eq!(10, a.eval(&mut t, 0));
        assert_eq!(5, b.eval(&mut t, 10));
    }

    #[test]
    fn param_size_from_initialized_mem_clamps_to_both_bounds() {
        let lenp = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        t.poke(lenp, &16u32.to_le_bytes());
        let ps = ParamSize::from_initialized_mem(&mut t, RemotePtr::<u32>::new_from_val(lenp));
        // The initial value is an upper bound even if the location grows.
        t.poke(lenp, &64u32.to_le_bytes());
        assert_eq!(16, ps.eval(&mut t, 0));
        // If the location shrinks, the new value wins.
        t.poke(lenp, &8u32.to_le_bytes());
        assert_eq!(8, ps.eval(&mut t, 0));
    }

    #[test]
    fn desched_syscall_bypasses_scratch_and_records_syscallbuf_data() {
        let rec_addr = MEM_BASE + 0x1000;
        let buf = MEM_BASE + 0x3000;
        let mut t = MockTask::new(SupportedArch::X64, x64::READ);
        let mut rec = syscallbuf_record::default();
        rec.syscallno = x64::READ as u16;
        rec.size = (size_of::<syscallbuf_record>() + 4) as u32;
        let rec_bytes = unsafe {
            std::slice::from_raw_parts(
                &rec as *const syscallbuf_record as *const u8,
                size_of::<syscallbuf_record>(),
            )
        };
        t.poke(rec_addr, rec_bytes);
        t.poke(rec_addr + size_of::<syscallbuf_record>(), &[9, 9, 9, 9]);
        t.desched = Some(RemotePtr::new_from_val(rec_addr));
        t.regs.set_arg1(7);
        t.regs.set_arg2(buf);
        t.regs.set_arg3(4);

        // Scratch must be left alone: the syscallbuf is serving that role.
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        assert_eq!(buf, t.regs.arg2());

        finish(&mut t, 4);
        let extra_addr = rec_addr + size_of::<syscallbuf_record>();
        assert_eq!(Some(&vec![9, 9, 9, 9]), t.recorded_at(extra_addr));
    }

    #[test]
    fn auxv_ordering_starts_with_the_arch_specific_key() {
        use crate::kernel_supplement::{AT_SYSINFO, AT_SYSINFO_EHDR};
        assert_eq!(AT_SYSINFO, X86Arch::ELF_AUXV_ORDERING[0]);
        assert_eq!(AT_SYSINFO_EHDR, X64Arch::ELF_AUXV_ORDERING[0]);
        assert_eq!(
            &X86Arch::ELF_AUXV_ORDERING[1..],
            &X64Arch::ELF_AUXV_ORDERING[..]
        );
    }

    #[test]
    fn restart_discards_state_and_nanosleep_flushes_rem() {
        let rem = MEM_BASE + 0x1000;
        let mut t = MockTask::new(SupportedArch::X64, x64::NANOSLEEP);
        t.regs.set_arg1(MEM_BASE + 0x2000);
        t.regs.set_arg2(rem);
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        let scratch_rem = t.regs.arg2();
        t.poke(scratch_rem, &[5u8; 16]);
        let mut r = t.regs;
        r.set_syscall_result_signed(-(crate::kernel_supplement::ERESTART_RESTARTBLOCK as isize));
        t.regs = r;

        rec_prepare_restart_syscall(&mut t);
        // The kernel-updated remaining time was propagated and recorded.
        assert_eq!(vec![5u8; 16], t.peek(rem, 16));
        assert_eq!(Some(&vec![5u8; 16]), t.recorded_at(rem));
        assert_eq!(rem, t.regs.arg2());

        // State is gone; a fresh prepare starts over.
        assert_eq!(AllowSwitch, rec_prepare_syscall(&mut t));
        assert_eq!(SCRATCH_BASE, t.regs.arg2());
    }
}
