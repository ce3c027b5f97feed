#![allow(non_camel_case_types)]

use crate::kernel_abi::{
    x64, x86, CloneParameterOrdering, CloneTLSType, MmapCallingSemantics, Ptr,
    SelectCallingSemantics, SupportedArch,
};
use crate::kernel_supplement::{
    AT_BASE, AT_CLKTCK, AT_EGID, AT_ENTRY, AT_EUID, AT_FLAGS, AT_GID, AT_HWCAP, AT_PAGESZ,
    AT_PHDR, AT_PHENT, AT_PHNUM, AT_SECURE, AT_SYSINFO, AT_SYSINFO_EHDR, AT_UID,
};
use crate::remote_ptr::RemotePtr;

#[derive(Copy, Clone, Default)]
pub struct X86Arch;

#[derive(Copy, Clone, Default)]
pub struct X64Arch;

#[cfg(target_arch = "x86_64")]
pub type NativeArch = X64Arch;

#[cfg(target_arch = "x86")]
pub type NativeArch = X86Arch;

/// A pointer-sized struct field in some tracee architecture; see
/// `kernel_abi::Ptr`. The bound lets generic code widen the field without
/// knowing the word size.
pub trait TraceePointer<ReferentT>: Copy {
    fn rptr(&self) -> RemotePtr<ReferentT>;
    fn is_null(&self) -> bool;
}

impl<ValT: Copy + Into<u64>, ReferentT> TraceePointer<ReferentT> for Ptr<ValT, ReferentT> {
    fn rptr(&self) -> RemotePtr<ReferentT> {
        Ptr::rptr(self)
    }
    fn is_null(&self) -> bool {
        Ptr::is_null(self)
    }
}

/// Everything the recording core needs to know about one tracee
/// architecture: word types, struct-layout helpers, calling-convention
/// variants, the auxv key order the kernel uses, and the syscall numbers the
/// per-syscall dispatch matches on. Syscalls an architecture doesn't have are
/// -1, which can never match because negative syscall numbers bail out before
/// dispatch.
pub trait Architecture: Copy + Clone + 'static {
    type unsigned_word: Copy + Default + Into<u64> + PartialEq + Eq;
    type signed_word: Copy + Default + Into<i64>;
    type unsigned_long: Copy + Default + Into<u64>;
    type signed_long: Copy + Default + Into<i64>;
    type size_t: Copy + Default + Into<u64>;
    type ssize_t: Copy + Default + Into<i64>;
    type off_t: Copy + Default + Into<i64>;

    /// A tracee-word-sized pointer to `T`, usable as a struct field.
    type ptr<T: 'static>: TraceePointer<T> + Copy + Default;

    /// [u8; 0] or [u8; 4]: padding inserted after a 4-byte field before the
    /// next word-aligned one.
    type std_pad: Copy + Default;
    /// Padding after msghdr.msg_namelen.
    type msghdr_pad: Copy + Default;
    /// Pads the ifreq union out to its kernel size past the pointer member.
    type ifreq_union_pad: Copy + Default;

    const MMAP_SEMANTICS: MmapCallingSemantics;
    const SELECT_SEMANTICS: SelectCallingSemantics;
    const CLONE_TLS_TYPE: CloneTLSType;
    const CLONE_PARAMETER_ORDERING: CloneParameterOrdering;
    const ELFCLASS: u8;

    /// The exact order in which the kernel deposits auxv keys on this
    /// architecture's initial stack.
    const ELF_AUXV_ORDERING: &'static [u64];

    fn arch() -> SupportedArch;

    const ACCEPT: i32;
    const ACCEPT4: i32;
    const CLONE: i32;
    const EPOLL_WAIT: i32;
    const EXECVE: i32;
    const EXIT: i32;
    const EXIT_GROUP: i32;
    const FCNTL: i32;
    const FCNTL64: i32;
    const FGETXATTR: i32;
    const FUTEX: i32;
    const GETCWD: i32;
    const GETDENTS: i32;
    const GETDENTS64: i32;
    const GETPEERNAME: i32;
    const GETSOCKNAME: i32;
    const GETSOCKOPT: i32;
    const GETXATTR: i32;
    const IOCTL: i32;
    const IPC: i32;
    const LGETXATTR: i32;
    const MMAP: i32;
    const MMAP2: i32;
    const MSGCTL: i32;
    const MSGRCV: i32;
    const MSGSND: i32;
    const NANOSLEEP: i32;
    const _NEWSELECT: i32;
    const OPEN: i32;
    const PAUSE: i32;
    const POLL: i32;
    const PPOLL: i32;
    const PRCTL: i32;
    const PREAD64: i32;
    const PREADV: i32;
    const QUOTACTL: i32;
    const READ: i32;
    const READLINK: i32;
    const READV: i32;
    const RECVFROM: i32;
    const RECVMMSG: i32;
    const RECVMSG: i32;
    const RT_SIGACTION: i32;
    const RT_SIGPENDING: i32;
    const RT_SIGPROCMASK: i32;
    const RT_SIGSUSPEND: i32;
    const RT_SIGTIMEDWAIT: i32;
    const SCHED_SETAFFINITY: i32;
    const SCHED_YIELD: i32;
    const SELECT: i32;
    const SENDFILE: i32;
    const SENDFILE64: i32;
    const SENDMMSG: i32;
    const SENDMSG: i32;
    const SET_ROBUST_LIST: i32;
    const SET_THREAD_AREA: i32;
    const SET_TID_ADDRESS: i32;
    const SETPRIORITY: i32;
    const SIGACTION: i32;
    const SIGPROCMASK: i32;
    const SIGSUSPEND: i32;
    const SOCKETCALL: i32;
    const SPLICE: i32;
    const _SYSCTL: i32;
    const WAIT4: i32;
    const WAITID: i32;
    const WAITPID: i32;
    const WRITE: i32;
    const WRITEV: i32;
}

impl Architecture for X86Arch {
    type unsigned_word = u32;
    type signed_word = i32;
    type unsigned_long = u32;
    type signed_long = i32;
    type size_t = u32;
    type ssize_t = i32;
    type off_t = i32;

    type ptr<T: 'static> = Ptr<u32, T>;

    type std_pad = [u8; 0];
    type msghdr_pad = [u8; 0];
    type ifreq_union_pad = [u8; 12];

    const MMAP_SEMANTICS: MmapCallingSemantics = MmapCallingSemantics::StructArguments;
    const SELECT_SEMANTICS: SelectCallingSemantics = SelectCallingSemantics::SelectStructArguments;
    const CLONE_TLS_TYPE: CloneTLSType = CloneTLSType::UserDescPointer;
    const CLONE_PARAMETER_ORDERING: CloneParameterOrdering =
        CloneParameterOrdering::FlagsStackParentTLSChild;
    const ELFCLASS: u8 = goblin::elf::header::ELFCLASS32;

    const ELF_AUXV_ORDERING: &'static [u64] = &[
        AT_SYSINFO,
        AT_SYSINFO_EHDR,
        AT_HWCAP,
        AT_PAGESZ,
        AT_CLKTCK,
        AT_PHDR,
        AT_PHENT,
        AT_PHNUM,
        AT_BASE,
        AT_FLAGS,
        AT_ENTRY,
        AT_UID,
        AT_EUID,
        AT_GID,
        AT_EGID,
        AT_SECURE,
    ];

    fn arch() -> SupportedArch {
        SupportedArch::X86
    }

    const ACCEPT: i32 = x86::ACCEPT;
    const ACCEPT4: i32 = x86::ACCEPT4;
    const CLONE: i32 = x86::CLONE;
    const EPOLL_WAIT: i32 = x86::EPOLL_WAIT;
    const EXECVE: i32 = x86::EXECVE;
    const EXIT: i32 = x86::EXIT;
    const EXIT_GROUP: i32 = x86::EXIT_GROUP;
    const FCNTL: i32 = x86::FCNTL;
    const FCNTL64: i32 = x86::FCNTL64;
    const FGETXATTR: i32 = x86::FGETXATTR;
    const FUTEX: i32 = x86::FUTEX;
    const GETCWD: i32 = x86::GETCWD;
    const GETDENTS: i32 = x86::GETDENTS;
    const GETDENTS64: i32 = x86::GETDENTS64;
    const GETPEERNAME: i32 = x86::GETPEERNAME;
    const GETSOCKNAME: i32 = x86::GETSOCKNAME;
    const GETSOCKOPT: i32 = x86::GETSOCKOPT;
    const GETXATTR: i32 = x86::GETXATTR;
    const IOCTL: i32 = x86::IOCTL;
    const IPC: i32 = x86::IPC;
    const LGETXATTR: i32 = x86::LGETXATTR;
    const MMAP: i32 = x86::MMAP;
    const MMAP2: i32 = x86::MMAP2;
    const MSGCTL: i32 = x86::MSGCTL;
    const MSGRCV: i32 = x86::MSGRCV;
    const MSGSND: i32 = x86::MSGSND;
    const NANOSLEEP: i32 = x86::NANOSLEEP;
    const _NEWSELECT: i32 = x86::_NEWSELECT;
    const OPEN: i32 = x86::OPEN;
    const PAUSE: i32 = x86::PAUSE;
    const POLL: i32 = x86::POLL;
    const PPOLL: i32 = x86::PPOLL;
    const PRCTL: i32 = x86::PRCTL;
    const PREAD64: i32 = x86::PREAD64;
    const PREADV: i32 = x86::PREADV;
    const QUOTACTL: i32 = x86::QUOTACTL;
    const READ: i32 = x86::READ;
    const READLINK: i32 = x86::READLINK;
    const READV: i32 = x86::READV;
    const RECVFROM: i32 = x86::RECVFROM;
    const RECVMMSG: i32 = x86::RECVMMSG;
    const RECVMSG: i32 = x86::RECVMSG;
    const RT_SIGACTION: i32 = x86::RT_SIGACTION;
    const RT_SIGPENDING: i32 = x86::RT_SIGPENDING;
    const RT_SIGPROCMASK: i32 = x86::RT_SIGPROCMASK;
    const RT_SIGSUSPEND: i32 = x86::RT_SIGSUSPEND;
    const RT_SIGTIMEDWAIT: i32 = x86::RT_SIGTIMEDWAIT;
    const SCHED_SETAFFINITY: i32 = x86::SCHED_SETAFFINITY;
    const SCHED_YIELD: i32 = x86::SCHED_YIELD;
    const SELECT: i32 = x86::SELECT;
    const SENDFILE: i32 = x86::SENDFILE;
    const SENDFILE64: i32 = x86::SENDFILE64;
    const SENDMMSG: i32 = x86::SENDMMSG;
    const SENDMSG: i32 = x86::SENDMSG;
    const SET_ROBUST_LIST: i32 = x86::SET_ROBUST_LIST;
    const SET_THREAD_AREA: i32 = x86::SET_THREAD_AREA;
    const SET_TID_ADDRESS: i32 = x86::SET_TID_ADDRESS;
    const SETPRIORITY: i32 = x86::SETPRIORITY;
    const SIGACTION: i32 = x86::SIGACTION;
    const SIGPROCMASK: i32 = x86::SIGPROCMASK;
    const SIGSUSPEND: i32 = x86::SIGSUSPEND;
    const SOCKETCALL: i32 = x86::SOCKETCALL;
    const SPLICE: i32 = x86::SPLICE;
    const _SYSCTL: i32 = x86::_SYSCTL;
    const WAIT4: i32 = x86::WAIT4;
    const WAITID: i32 = x86::WAITID;
    const WAITPID: i32 = x86::WAITPID;
    const WRITE: i32 = x86::WRITE;
    const WRITEV: i32 = x86::WRITEV;
}

impl Architecture for X64Arch {
    type unsigned_word = u64;
    type signed_word = i64;
    type unsigned_long = u64;
    type signed_long = i64;
    type size_t = u64;
    type ssize_t = i64;
    type off_t = i64;

    type ptr<T: 'static> = Ptr<u64, T>;

    type std_pad = [u8; 4];
    type msghdr_pad = [u8; 4];
    type ifreq_union_pad = [u8; 16];

    const MMAP_SEMANTICS: MmapCallingSemantics = MmapCallingSemantics::RegisterArguments;
    const SELECT_SEMANTICS: SelectCallingSemantics =
        SelectCallingSemantics::SelectRegisterArguments;
    const CLONE_TLS_TYPE: CloneTLSType = CloneTLSType::PthreadStructurePointer;
    const CLONE_PARAMETER_ORDERING: CloneParameterOrdering =
        CloneParameterOrdering::FlagsStackParentChildTLS;
    const ELFCLASS: u8 = goblin::elf::header::ELFCLASS64;

    const ELF_AUXV_ORDERING: &'static [u64] = &[
        AT_SYSINFO_EHDR,
        AT_HWCAP,
        AT_PAGESZ,
        AT_CLKTCK,
        AT_PHDR,
        AT_PHENT,
        AT_PHNUM,
        AT_BASE,
        AT_FLAGS,
        AT_ENTRY,
        AT_UID,
        AT_EUID,
        AT_GID,
        AT_EGID,
        AT_SECURE,
    ];

    fn arch() -> SupportedArch {
        SupportedArch::X64
    }

    const ACCEPT: i32 = x64::ACCEPT;
    const ACCEPT4: i32 = x64::ACCEPT4;
    const CLONE: i32 = x64::CLONE;
    const EPOLL_WAIT: i32 = x64::EPOLL_WAIT;
    const EXECVE: i32 = x64::EXECVE;
    const EXIT: i32 = x64::EXIT;
    const EXIT_GROUP: i32 = x64::EXIT_GROUP;
    const FCNTL: i32 = x64::FCNTL;
    const FCNTL64: i32 = x64::FCNTL64;
    const FGETXATTR: i32 = x64::FGETXATTR;
    const FUTEX: i32 = x64::FUTEX;
    const GETCWD: i32 = x64::GETCWD;
    const GETDENTS: i32 = x64::GETDENTS;
    const GETDENTS64: i32 = x64::GETDENTS64;
    const GETPEERNAME: i32 = x64::GETPEERNAME;
    const GETSOCKNAME: i32 = x64::GETSOCKNAME;
    const GETSOCKOPT: i32 = x64::GETSOCKOPT;
    const GETXATTR: i32 = x64::GETXATTR;
    const IOCTL: i32 = x64::IOCTL;
    const IPC: i32 = x64::IPC;
    const LGETXATTR: i32 = x64::LGETXATTR;
    const MMAP: i32 = x64::MMAP;
    const MMAP2: i32 = x64::MMAP2;
    const MSGCTL: i32 = x64::MSGCTL;
    const MSGRCV: i32 = x64::MSGRCV;
    const MSGSND: i32 = x64::MSGSND;
    const NANOSLEEP: i32 = x64::NANOSLEEP;
    const _NEWSELECT: i32 = x64::_NEWSELECT;
    const OPEN: i32 = x64::OPEN;
    const PAUSE: i32 = x64::PAUSE;
    const POLL: i32 = x64::POLL;
    const PPOLL: i32 = x64::PPOLL;
    const PRCTL: i32 = x64::PRCTL;
    const PREAD64: i32 = x64::PREAD64;
    const PREADV: i32 = x64::PREADV;
    const QUOTACTL: i32 = x64::QUOTACTL;
    const READ: i32 = x64::READ;
    const READLINK: i32 = x64::READLINK;
    const READV: i32 = x64::READV;
    const RECVFROM: i32 = x64::RECVFROM;
    const RECVMMSG: i32 = x64::RECVMMSG;
    const RECVMSG: i32 = x64::RECVMSG;
    const RT_SIGACTION: i32 = x64::RT_SIGACTION;
    const RT_SIGPENDING: i32 = x64::RT_SIGPENDING;
    const RT_SIGPROCMASK: i32 = x64::RT_SIGPROCMASK;
    const RT_SIGSUSPEND: i32 = x64::RT_SIGSUSPEND;
    const RT_SIGTIMEDWAIT: i32 = x64::RT_SIGTIMEDWAIT;
    const SCHED_SETAFFINITY: i32 = x64::SCHED_SETAFFINITY;
    const SCHED_YIELD: i32 = x64::SCHED_YIELD;
    const SELECT: i32 = x64::SELECT;
    const SENDFILE: i32 = x64::SENDFILE;
    const SENDFILE64: i32 = x64::SENDFILE64;
    const SENDMMSG: i32 = x64::SENDMMSG;
    const SENDMSG: i32 = x64::SENDMSG;
    const SET_ROBUST_LIST: i32 = x64::SET_ROBUST_LIST;
    const SET_THREAD_AREA: i32 = x64::SET_THREAD_AREA;
    const SET_TID_ADDRESS: i32 = x64::SET_TID_ADDRESS;
    const SETPRIORITY: i32 = x64::SETPRIORITY;
    const SIGACTION: i32 = x64::SIGACTION;
    const SIGPROCMASK: i32 = x64::SIGPROCMASK;
    const SIGSUSPEND: i32 = x64::SIGSUSPEND;
    const SOCKETCALL: i32 = x64::SOCKETCALL;
    const SPLICE: i32 = x64::SPLICE;
    const _SYSCTL: i32 = x64::_SYSCTL;
    const WAIT4: i32 = x64::WAIT4;
    const WAITID: i32 = x64::WAITID;
    const WAITPID: i32 = x64::WAITPID;
    const WRITE: i32 = x64::WRITE;
    const WRITEV: i32 = x64::WRITEV;
}
