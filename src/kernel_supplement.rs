//! Kernel ABI constants that libc does not export (or exports with values we
//! cannot rely on across libc versions). Values are from the upstream kernel
//! headers; everything here is identical for the architectures we record
//! unless noted.

#![allow(non_upper_case_globals)]

/// In-kernel restart codes, visible to us through the syscall result
/// register while a syscall is being interrupted/restarted.
pub const ERESTARTSYS: u32 = 512;
pub const ERESTARTNOINTR: u32 = 513;
pub const ERESTARTNOHAND: u32 = 514;
pub const ERESTART_RESTARTBLOCK: u32 = 516;

// <linux/auxvec.h>, <asm/auxvec.h>
pub const AT_PHDR: u64 = 3;
pub const AT_PHENT: u64 = 4;
pub const AT_PHNUM: u64 = 5;
pub const AT_PAGESZ: u64 = 6;
pub const AT_BASE: u64 = 7;
pub const AT_FLAGS: u64 = 8;
pub const AT_ENTRY: u64 = 9;
pub const AT_UID: u64 = 11;
pub const AT_EUID: u64 = 12;
pub const AT_GID: u64 = 13;
pub const AT_EGID: u64 = 14;
pub const AT_HWCAP: u64 = 16;
pub const AT_CLKTCK: u64 = 17;
pub const AT_SECURE: u64 = 23;
pub const AT_RANDOM: u64 = 25;
pub const AT_SYSINFO: u64 = 32;
pub const AT_SYSINFO_EHDR: u64 = 33;

// <linux/futex.h>
pub const FUTEX_WAIT: i32 = 0;
pub const FUTEX_WAKE: i32 = 1;
pub const FUTEX_FD: i32 = 2;
pub const FUTEX_REQUEUE: i32 = 3;
pub const FUTEX_CMP_REQUEUE: i32 = 4;
pub const FUTEX_WAKE_OP: i32 = 5;
pub const FUTEX_LOCK_PI: i32 = 6;
pub const FUTEX_UNLOCK_PI: i32 = 7;
pub const FUTEX_TRYLOCK_PI: i32 = 8;
pub const FUTEX_WAIT_BITSET: i32 = 9;
pub const FUTEX_WAKE_BITSET: i32 = 10;
pub const FUTEX_PRIVATE_FLAG: i32 = 128;
pub const FUTEX_CLOCK_REALTIME: i32 = 256;
pub const FUTEX_CMD_MASK: i32 = !(FUTEX_PRIVATE_FLAG | FUTEX_CLOCK_REALTIME);

/// socketcall(2) call numbers, <linux/net.h>.
pub mod socketcall {
    pub const SYS_SOCKET: i32 = 1;
    pub const SYS_BIND: i32 = 2;
    pub const SYS_CONNECT: i32 = 3;
    pub const SYS_LISTEN: i32 = 4;
    pub const SYS_ACCEPT: i32 = 5;
    pub const SYS_GETSOCKNAME: i32 = 6;
    pub const SYS_GETPEERNAME: i32 = 7;
    pub const SYS_SOCKETPAIR: i32 = 8;
    pub const SYS_SEND: i32 = 9;
    pub const SYS_RECV: i32 = 10;
    pub const SYS_SENDTO: i32 = 11;
    pub const SYS_RECVFROM: i32 = 12;
    pub const SYS_SHUTDOWN: i32 = 13;
    pub const SYS_SETSOCKOPT: i32 = 14;
    pub const SYS_GETSOCKOPT: i32 = 15;
    pub const SYS_SENDMSG: i32 = 16;
    pub const SYS_RECVMSG: i32 = 17;
    pub const SYS_ACCEPT4: i32 = 18;
    pub const SYS_RECVMMSG: i32 = 19;
    pub const SYS_SENDMMSG: i32 = 20;
}

/// ipc(2) call numbers, <linux/ipc.h>.
pub mod ipc_call {
    pub const SEMOP: i32 = 1;
    pub const SEMGET: i32 = 2;
    pub const SEMCTL: i32 = 3;
    pub const SEMTIMEDOP: i32 = 4;
    pub const MSGSND: i32 = 11;
    pub const MSGRCV: i32 = 12;
    pub const MSGGET: i32 = 13;
    pub const MSGCTL: i32 = 14;
    pub const SHMAT: i32 = 21;
    pub const SHMDT: i32 = 22;
    pub const SHMGET: i32 = 23;
    pub const SHMCTL: i32 = 24;
}

/// Flag ORed into ipc/shm/msg control commands to select the 64-bit variants
/// of the result structures.
pub const IPC_64: i32 = 0x100;

// quotactl(2) command composition, <linux/quota.h>
pub const SUBCMDMASK: i32 = 0x00ff;
pub const SUBCMDSHIFT: i32 = 8;

// _IOC fields, <asm-generic/ioctl.h>
pub const IOC_NRBITS: u32 = 8;
pub const IOC_TYPEBITS: u32 = 8;
pub const IOC_SIZEBITS: u32 = 14;
pub const IOC_NRSHIFT: u32 = 0;
pub const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
pub const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
pub const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
pub const IOC_WRITE: u32 = 1;
pub const IOC_READ: u32 = 2;

pub fn ioc_type(request: u32) -> u32 {
    (request >> IOC_TYPESHIFT) & 0xff
}

pub fn ioc_nr(request: u32) -> u32 {
    (request >> IOC_NRSHIFT) & 0xff
}

pub fn ioc_dir(request: u32) -> u32 {
    (request >> IOC_DIRSHIFT) & 0x3
}

pub fn ioc_size(request: u32) -> u32 {
    (request >> IOC_SIZESHIFT) & 0x3fff
}

// Irregular ioctl request numbers, <linux/sockios.h>, <linux/wireless.h>,
// <asm-generic/ioctls.h>. These predate the _IOC scheme and are the same on
// x86 and x86-64.
pub const SIOCGIFNAME: u32 = 0x8910;
pub const SIOCGIFCONF: u32 = 0x8912;
pub const SIOCGIFFLAGS: u32 = 0x8913;
pub const SIOCGIFADDR: u32 = 0x8915;
pub const SIOCGIFMTU: u32 = 0x8921;
pub const SIOCGIFINDEX: u32 = 0x8933;
pub const SIOCETHTOOL: u32 = 0x8946;
pub const SIOCGIWRATE: u32 = 0x8b21;
pub const TCGETS: u32 = 0x5401;
pub const TIOCGWINSZ: u32 = 0x5413;
/// TIOCINQ aliases FIONREAD.
pub const TIOCINQ: u32 = 0x541b;

/// The ioctl "type" byte the Direct Rendering Manager owns ('d'). DRM ioctls
/// are intentionally unhandled: some of them open files behind the tracer's
/// back.
pub const DRM_IOCTL_TYPE: u32 = 0x64;

/// 0x46-series ioctls we have observed in the wild but never identified.
pub const UNIDENTIFIED_0X46_IOCTLS: &[u32] = &[0xc020462b, 0xc048464d, 0xc0204637, 0xc0304627];

// kcmp(2)
pub const KCMP_FILE: i32 = 0;

// prctl(2) option numbers, <linux/prctl.h>
pub const PR_GET_PDEATHSIG: i32 = 2;
pub const PR_GET_UNALIGN: i32 = 5;
pub const PR_GET_FPEMU: i32 = 9;
pub const PR_GET_FPEXC: i32 = 11;
pub const PR_SET_NAME: i32 = 15;
pub const PR_GET_NAME: i32 = 16;
pub const PR_GET_ENDIAN: i32 = 19;
pub const PR_SET_SECCOMP: i32 = 22;
pub const PR_GET_TSC: i32 = 25;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioc_decomposition() {
        // TCGETS is type 'T'(0x54), nr 1, no direction bits.
        assert_eq!(0x54, ioc_type(TCGETS));
        assert_eq!(1, ioc_nr(TCGETS));
        assert_eq!(0, ioc_dir(TCGETS));
        // SIOCETHTOOL decomposes as type 0x89.
        assert_eq!(0x89, ioc_type(SIOCETHTOOL));
    }

    #[test]
    fn futex_cmd_mask_strips_flags() {
        assert_eq!(
            FUTEX_WAIT,
            (FUTEX_WAIT | FUTEX_PRIVATE_FLAG) & FUTEX_CMD_MASK
        );
        assert_eq!(
            FUTEX_WAIT_BITSET,
            (FUTEX_WAIT_BITSET | FUTEX_PRIVATE_FLAG | FUTEX_CLOCK_REALTIME) & FUTEX_CMD_MASK
        );
    }
}
