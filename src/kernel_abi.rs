#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use crate::remote_ptr::RemotePtr;
use std::marker::PhantomData;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SupportedArch {
    X86,
    X64,
}

#[cfg(target_arch = "x86_64")]
pub const RETRACE_NATIVE_ARCH: SupportedArch = SupportedArch::X64;

#[cfg(target_arch = "x86")]
pub const RETRACE_NATIVE_ARCH: SupportedArch = SupportedArch::X86;

/// Dispatch a function generic over `Architecture` on a runtime
/// `SupportedArch` value.
macro_rules! rt_arch_function {
    ($func_name:ident, $arch:expr) => {
        match $arch {
            crate::kernel_abi::SupportedArch::X86 => $func_name::<crate::arch::X86Arch>(),
            crate::kernel_abi::SupportedArch::X64 => $func_name::<crate::arch::X64Arch>(),
        }
    };
    ($func_name:ident, $arch:expr, $($exp:expr),+) => {
        match $arch {
            crate::kernel_abi::SupportedArch::X86 => $func_name::<crate::arch::X86Arch>($($exp),+),
            crate::kernel_abi::SupportedArch::X64 => $func_name::<crate::arch::X64Arch>($($exp),+),
        }
    };
}

/// How a tracee architecture passes mmap arguments.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MmapCallingSemantics {
    /// x86-ish mmap(2): a pointer to one struct carrying all six arguments.
    StructArguments,
    /// Arguments passed in registers; the offset is scaled per syscall.
    RegisterArguments,
}

/// How a tracee architecture passes select arguments.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SelectCallingSemantics {
    SelectStructArguments,
    SelectRegisterArguments,
}

/// What the tls argument of clone points at.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CloneTLSType {
    /// A struct user_desc (x86).
    UserDescPointer,
    /// A pointer into the pthread structure (x86-64).
    PthreadStructurePointer,
}

/// Ordering of the last three clone(2) arguments.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CloneParameterOrdering {
    /// i386: clone(flags, stack, ptid, tls, ctid)
    FlagsStackParentTLSChild,
    /// x86-64: clone(flags, stack, ptid, ctid, tls)
    FlagsStackParentChildTLS,
}

/// A tracee-side pointer embedded in a tracee-side structure: its width is
/// the tracee's word size, not ours. `rptr()` widens it to a `RemotePtr`.
#[repr(C)]
pub struct Ptr<ValT: Copy, ReferentT> {
    val: ValT,
    referent: PhantomData<ReferentT>,
}

impl<ValT: Copy + Into<u64>, ReferentT> Ptr<ValT, ReferentT> {
    pub fn rptr(&self) -> RemotePtr<ReferentT> {
        let val: u64 = self.val.into();
        RemotePtr::new_from_val(val as usize)
    }

    pub fn is_null(&self) -> bool {
        let val: u64 = self.val.into();
        val == 0
    }
}

impl<ValT: Copy, ReferentT> Copy for Ptr<ValT, ReferentT> {}

impl<ValT: Copy, ReferentT> Clone for Ptr<ValT, ReferentT> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<ValT: Copy + Default, ReferentT> Default for Ptr<ValT, ReferentT> {
    fn default() -> Self {
        Ptr {
            val: ValT::default(),
            referent: PhantomData,
        }
    }
}

pub mod common {
    //! Types and constants identical across the architectures we record.

    pub type socklen_t = u32;

    /// fcntl operations, as the kernel numbers them. F_*LK64 only make sense
    /// for 32-bit tracees but the numbering is shared.
    pub mod fcntl_operation {
        pub const DUPFD: u32 = 0;
        pub const GETFD: u32 = 1;
        pub const SETFD: u32 = 2;
        pub const GETFL: u32 = 3;
        pub const SETFL: u32 = 4;
        pub const GETLK: u32 = 5;
        pub const SETLK: u32 = 6;
        pub const SETLKW: u32 = 7;
        pub const SETOWN: u32 = 8;
        pub const GETOWN: u32 = 9;
        pub const SETSIG: u32 = 10;
        pub const GETSIG: u32 = 11;
        pub const GETLK64: u32 = 12;
        pub const SETLK64: u32 = 13;
        pub const SETLKW64: u32 = 14;
        pub const SETOWN_EX: u32 = 15;
        pub const GETOWN_EX: u32 = 16;
    }
}

pub mod x86 {
    //! The i386 kernel ABI: word types, the ptrace register file, and
    //! syscall numbers (from arch/x86/entry/syscalls/syscall_32.tbl).

    pub type unsigned_word = u32;
    pub type signed_word = i32;
    pub type unsigned_long = u32;
    pub type signed_long = i32;
    pub type size_t = u32;
    pub type ssize_t = i32;
    pub type off_t = i32;

    #[repr(C)]
    #[derive(Copy, Clone, Default)]
    pub struct user_regs_struct {
        pub ebx: i32,
        pub ecx: i32,
        pub edx: i32,
        pub esi: i32,
        pub edi: i32,
        pub ebp: i32,
        pub eax: i32,
        pub xds: i32,
        pub xes: i32,
        pub xfs: i32,
        pub xgs: i32,
        pub orig_eax: i32,
        pub eip: i32,
        pub xcs: i32,
        pub eflags: i32,
        pub esp: i32,
        pub xss: i32,
    }

    pub const RESTART_SYSCALL: i32 = 0;
    pub const EXIT: i32 = 1;
    pub const READ: i32 = 3;
    pub const WRITE: i32 = 4;
    pub const OPEN: i32 = 5;
    pub const CLOSE: i32 = 6;
    pub const WAITPID: i32 = 7;
    pub const EXECVE: i32 = 11;
    pub const PAUSE: i32 = 29;
    pub const IOCTL: i32 = 54;
    pub const FCNTL: i32 = 55;
    pub const SIGACTION: i32 = 67;
    pub const SIGSUSPEND: i32 = 72;
    pub const SELECT: i32 = 82;
    pub const READLINK: i32 = 85;
    pub const MMAP: i32 = 90;
    pub const MUNMAP: i32 = 91;
    pub const SETPRIORITY: i32 = 97;
    pub const SOCKETCALL: i32 = 102;
    pub const WAIT4: i32 = 114;
    pub const IPC: i32 = 117;
    pub const CLONE: i32 = 120;
    pub const SIGPROCMASK: i32 = 126;
    pub const QUOTACTL: i32 = 131;
    pub const GETDENTS: i32 = 141;
    pub const _NEWSELECT: i32 = 142;
    pub const READV: i32 = 145;
    pub const WRITEV: i32 = 146;
    pub const _SYSCTL: i32 = 149;
    pub const SCHED_YIELD: i32 = 158;
    pub const NANOSLEEP: i32 = 162;
    pub const POLL: i32 = 168;
    pub const PRCTL: i32 = 172;
    pub const RT_SIGACTION: i32 = 174;
    pub const RT_SIGPROCMASK: i32 = 175;
    pub const RT_SIGPENDING: i32 = 176;
    pub const RT_SIGTIMEDWAIT: i32 = 177;
    pub const RT_SIGSUSPEND: i32 = 179;
    pub const PREAD64: i32 = 180;
    pub const GETCWD: i32 = 183;
    pub const SENDFILE: i32 = 187;
    pub const MMAP2: i32 = 192;
    pub const GETDENTS64: i32 = 220;
    pub const FCNTL64: i32 = 221;
    pub const GETXATTR: i32 = 229;
    pub const LGETXATTR: i32 = 230;
    pub const FGETXATTR: i32 = 231;
    pub const SENDFILE64: i32 = 239;
    pub const FUTEX: i32 = 240;
    pub const SCHED_SETAFFINITY: i32 = 241;
    pub const SET_THREAD_AREA: i32 = 243;
    pub const EXIT_GROUP: i32 = 252;
    pub const EPOLL_WAIT: i32 = 256;
    pub const SET_TID_ADDRESS: i32 = 258;
    pub const WAITID: i32 = 284;
    pub const PPOLL: i32 = 309;
    pub const SET_ROBUST_LIST: i32 = 311;
    pub const SPLICE: i32 = 313;
    pub const PREADV: i32 = 333;
    pub const RECVMMSG: i32 = 337;
    pub const SENDMMSG: i32 = 345;
    pub const KCMP: i32 = 349;

    // Direct socket and sysv-ipc syscalls do not exist on i386; everything
    // goes through socketcall/ipc.
    pub const ACCEPT: i32 = -1;
    pub const ACCEPT4: i32 = -1;
    pub const GETPEERNAME: i32 = -1;
    pub const GETSOCKNAME: i32 = -1;
    pub const GETSOCKOPT: i32 = -1;
    pub const MSGCTL: i32 = -1;
    pub const MSGRCV: i32 = -1;
    pub const MSGSND: i32 = -1;
    pub const RECVFROM: i32 = -1;
    pub const RECVMSG: i32 = -1;
    pub const SENDMSG: i32 = -1;

    pub fn syscallname(syscall: i32) -> String {
        match syscall {
            RESTART_SYSCALL => "restart_syscall".into(),
            EXIT => "exit".into(),
            READ => "read".into(),
            WRITE => "write".into(),
            OPEN => "open".into(),
            CLOSE => "close".into(),
            WAITPID => "waitpid".into(),
            EXECVE => "execve".into(),
            PAUSE => "pause".into(),
            IOCTL => "ioctl".into(),
            FCNTL => "fcntl".into(),
            SIGACTION => "sigaction".into(),
            SIGSUSPEND => "sigsuspend".into(),
            SELECT => "select".into(),
            READLINK => "readlink".into(),
            MMAP => "mmap".into(),
            MUNMAP => "munmap".into(),
            SETPRIORITY => "setpriority".into(),
            SOCKETCALL => "socketcall".into(),
            WAIT4 => "wait4".into(),
            IPC => "ipc".into(),
            CLONE => "clone".into(),
            SIGPROCMASK => "sigprocmask".into(),
            QUOTACTL => "quotactl".into(),
            GETDENTS => "getdents".into(),
            _NEWSELECT => "_newselect".into(),
            READV => "readv".into(),
            WRITEV => "writev".into(),
            _SYSCTL => "_sysctl".into(),
            SCHED_YIELD => "sched_yield".into(),
            NANOSLEEP => "nanosleep".into(),
            POLL => "poll".into(),
            PRCTL => "prctl".into(),
            RT_SIGACTION => "rt_sigaction".into(),
            RT_SIGPROCMASK => "rt_sigprocmask".into(),
            RT_SIGPENDING => "rt_sigpending".into(),
            RT_SIGTIMEDWAIT => "rt_sigtimedwait".into(),
            RT_SIGSUSPEND => "rt_sigsuspend".into(),
            PREAD64 => "pread64".into(),
            GETCWD => "getcwd".into(),
            SENDFILE => "sendfile".into(),
            MMAP2 => "mmap2".into(),
            GETDENTS64 => "getdents64".into(),
            FCNTL64 => "fcntl64".into(),
            GETXATTR => "getxattr".into(),
            LGETXATTR => "lgetxattr".into(),
            FGETXATTR => "fgetxattr".into(),
            SENDFILE64 => "sendfile64".into(),
            FUTEX => "futex".into(),
            SCHED_SETAFFINITY => "sched_setaffinity".into(),
            SET_THREAD_AREA => "set_thread_area".into(),
            EXIT_GROUP => "exit_group".into(),
            EPOLL_WAIT => "epoll_wait".into(),
            SET_TID_ADDRESS => "set_tid_address".into(),
            WAITID => "waitid".into(),
            PPOLL => "ppoll".into(),
            SET_ROBUST_LIST => "set_robust_list".into(),
            SPLICE => "splice".into(),
            PREADV => "preadv".into(),
            RECVMMSG => "recvmmsg".into(),
            SENDMMSG => "sendmmsg".into(),
            KCMP => "kcmp".into(),
            _ => format!("<unknown-syscall-{}>", syscall),
        }
    }
}

pub mod x64 {
    //! The x86-64 kernel ABI (arch/x86/entry/syscalls/syscall_64.tbl).

    pub type unsigned_word = u64;
    pub type signed_word = i64;
    pub type unsigned_long = u64;
    pub type signed_long = i64;
    pub type size_t = u64;
    pub type ssize_t = i64;
    pub type off_t = i64;

    #[repr(C)]
    #[derive(Copy, Clone, Default)]
    pub struct user_regs_struct {
        pub r15: u64,
        pub r14: u64,
        pub r13: u64,
        pub r12: u64,
        pub rbp: u64,
        pub rbx: u64,
        pub r11: u64,
        pub r10: u64,
        pub r9: u64,
        pub r8: u64,
        pub rax: u64,
        pub rcx: u64,
        pub rdx: u64,
        pub rsi: u64,
        pub rdi: u64,
        pub orig_rax: u64,
        pub rip: u64,
        pub cs: u64,
        pub eflags: u64,
        pub rsp: u64,
        pub ss: u64,
        pub fs_base: u64,
        pub gs_base: u64,
        pub ds: u64,
        pub es: u64,
        pub fs: u64,
        pub gs: u64,
    }

    pub const READ: i32 = 0;
    pub const WRITE: i32 = 1;
    pub const OPEN: i32 = 2;
    pub const CLOSE: i32 = 3;
    pub const POLL: i32 = 7;
    pub const MMAP: i32 = 9;
    pub const IOCTL: i32 = 16;
    pub const PREAD64: i32 = 17;
    pub const READV: i32 = 19;
    pub const WRITEV: i32 = 20;
    pub const SELECT: i32 = 23;
    pub const SCHED_YIELD: i32 = 24;
    pub const PAUSE: i32 = 34;
    pub const NANOSLEEP: i32 = 35;
    pub const SENDFILE: i32 = 40;
    pub const ACCEPT: i32 = 43;
    pub const RECVFROM: i32 = 45;
    pub const SENDMSG: i32 = 46;
    pub const RECVMSG: i32 = 47;
    pub const GETSOCKNAME: i32 = 51;
    pub const GETPEERNAME: i32 = 52;
    pub const GETSOCKOPT: i32 = 55;
    pub const CLONE: i32 = 56;
    pub const EXECVE: i32 = 59;
    pub const EXIT: i32 = 60;
    pub const WAIT4: i32 = 61;
    pub const MSGSND: i32 = 69;
    pub const MSGRCV: i32 = 70;
    pub const MSGCTL: i32 = 71;
    pub const FCNTL: i32 = 72;
    pub const GETDENTS: i32 = 78;
    pub const GETCWD: i32 = 79;
    pub const READLINK: i32 = 89;
    pub const RT_SIGACTION: i32 = 13;
    pub const RT_SIGPROCMASK: i32 = 14;
    pub const RT_SIGPENDING: i32 = 127;
    pub const RT_SIGTIMEDWAIT: i32 = 128;
    pub const RT_SIGSUSPEND: i32 = 130;
    pub const SETPRIORITY: i32 = 141;
    pub const _SYSCTL: i32 = 156;
    pub const PRCTL: i32 = 157;
    pub const QUOTACTL: i32 = 179;
    pub const GETXATTR: i32 = 191;
    pub const LGETXATTR: i32 = 192;
    pub const FGETXATTR: i32 = 193;
    pub const FUTEX: i32 = 202;
    pub const SCHED_SETAFFINITY: i32 = 203;
    pub const SET_THREAD_AREA: i32 = 205;
    pub const GETDENTS64: i32 = 217;
    pub const SET_TID_ADDRESS: i32 = 218;
    pub const RESTART_SYSCALL: i32 = 219;
    pub const EXIT_GROUP: i32 = 231;
    pub const EPOLL_WAIT: i32 = 232;
    pub const WAITID: i32 = 247;
    pub const PPOLL: i32 = 271;
    pub const SET_ROBUST_LIST: i32 = 273;
    pub const SPLICE: i32 = 275;
    pub const ACCEPT4: i32 = 288;
    pub const PREADV: i32 = 295;
    pub const RECVMMSG: i32 = 299;
    pub const SENDMMSG: i32 = 307;
    pub const KCMP: i32 = 312;

    // i386-only multiplexers and variants.
    pub const WAITPID: i32 = -1;
    pub const SIGACTION: i32 = -1;
    pub const SIGSUSPEND: i32 = -1;
    pub const SIGPROCMASK: i32 = -1;
    pub const SOCKETCALL: i32 = -1;
    pub const IPC: i32 = -1;
    pub const _NEWSELECT: i32 = -1;
    pub const MMAP2: i32 = -1;
    pub const FCNTL64: i32 = -1;
    pub const SENDFILE64: i32 = -1;

    pub fn syscallname(syscall: i32) -> String {
        match syscall {
            READ => "read".into(),
            WRITE => "write".into(),
            OPEN => "open".into(),
            CLOSE => "close".into(),
            POLL => "poll".into(),
            MMAP => "mmap".into(),
            RT_SIGACTION => "rt_sigaction".into(),
            RT_SIGPROCMASK => "rt_sigprocmask".into(),
            IOCTL => "ioctl".into(),
            PREAD64 => "pread64".into(),
            READV => "readv".into(),
            WRITEV => "writev".into(),
            SELECT => "select".into(),
            SCHED_YIELD => "sched_yield".into(),
            PAUSE => "pause".into(),
            NANOSLEEP => "nanosleep".into(),
            SENDFILE => "sendfile".into(),
            ACCEPT => "accept".into(),
            RECVFROM => "recvfrom".into(),
            SENDMSG => "sendmsg".into(),
            RECVMSG => "recvmsg".into(),
            GETSOCKNAME => "getsockname".into(),
            GETPEERNAME => "getpeername".into(),
            GETSOCKOPT => "getsockopt".into(),
            CLONE => "clone".into(),
            EXECVE => "execve".into(),
            EXIT => "exit".into(),
            WAIT4 => "wait4".into(),
            MSGSND => "msgsnd".into(),
            MSGRCV => "msgrcv".into(),
            MSGCTL => "msgctl".into(),
            FCNTL => "fcntl".into(),
            GETDENTS => "getdents".into(),
            GETCWD => "getcwd".into(),
            READLINK => "readlink".into(),
            RT_SIGPENDING => "rt_sigpending".into(),
            RT_SIGTIMEDWAIT => "rt_sigtimedwait".into(),
            RT_SIGSUSPEND => "rt_sigsuspend".into(),
            SETPRIORITY => "setpriority".into(),
            _SYSCTL => "_sysctl".into(),
            PRCTL => "prctl".into(),
            QUOTACTL => "quotactl".into(),
            GETXATTR => "getxattr".into(),
            LGETXATTR => "lgetxattr".into(),
            FGETXATTR => "fgetxattr".into(),
            FUTEX => "futex".into(),
            SCHED_SETAFFINITY => "sched_setaffinity".into(),
            SET_THREAD_AREA => "set_thread_area".into(),
            GETDENTS64 => "getdents64".into(),
            SET_TID_ADDRESS => "set_tid_address".into(),
            RESTART_SYSCALL => "restart_syscall".into(),
            EXIT_GROUP => "exit_group".into(),
            EPOLL_WAIT => "epoll_wait".into(),
            WAITID => "waitid".into(),
            PPOLL => "ppoll".into(),
            SET_ROBUST_LIST => "set_robust_list".into(),
            SPLICE => "splice".into(),
            ACCEPT4 => "accept4".into(),
            PREADV => "preadv".into(),
            RECVMMSG => "recvmmsg".into(),
            SENDMMSG => "sendmmsg".into(),
            KCMP => "kcmp".into(),
            _ => format!("<unknown-syscall-{}>", syscall),
        }
    }
}

#[cfg(target_arch = "x86_64")]
assert_eq_size!(x64::user_regs_struct, libc::user_regs_struct);

pub fn word_size(arch: SupportedArch) -> usize {
    match arch {
        SupportedArch::X86 => 4,
        SupportedArch::X64 => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regs_struct_sizes() {
        assert_eq!(68, std::mem::size_of::<x86::user_regs_struct>());
        assert_eq!(216, std::mem::size_of::<x64::user_regs_struct>());
    }

    #[test]
    fn name_lookup() {
        assert_eq!("read", x64::syscallname(0));
        assert_eq!("read", x86::syscallname(3));
        assert_eq!("<unknown-syscall-9999>", x64::syscallname(9999));
    }
}
