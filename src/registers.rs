use crate::kernel_abi::{x64, x86, SupportedArch};
use crate::kernel_supplement::{
    ERESTARTNOHAND, ERESTARTNOINTR, ERESTARTSYS, ERESTART_RESTARTBLOCK,
};
use crate::remote_ptr::{RemotePtr, Void};
use std::fmt::{Debug, Formatter};
use std::io::Write;
use SupportedArch::*;

macro_rules! rt_get_reg {
    ($slf:expr, $x86case:ident, $x64case:ident) => {
        unsafe {
            match $slf.arch_ {
                crate::kernel_abi::SupportedArch::X86 => $slf.u.x86.$x86case as u32 as usize,
                crate::kernel_abi::SupportedArch::X64 => $slf.u.x64.$x64case as usize,
            }
        }
    };
}

macro_rules! rt_set_reg {
    ($slf:expr, $x86case:ident, $x64case:ident, $val:expr) => {
        match $slf.arch_ {
            crate::kernel_abi::SupportedArch::X86 => {
                $slf.u.x86.$x86case = $val as i32;
            }
            crate::kernel_abi::SupportedArch::X64 => {
                $slf.u.x64.$x64case = $val as u64;
            }
        }
    };
}

macro_rules! rt_get_reg_signed {
    ($slf:expr, $x86case:ident, $x64case:ident) => {
        match $slf.arch_ {
            crate::kernel_abi::SupportedArch::X86 => unsafe { $slf.u.x86.$x86case as isize },
            crate::kernel_abi::SupportedArch::X64 => unsafe { $slf.u.x64.$x64case as i64 as isize },
        }
    };
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union RegistersUnion {
    x86: x86::user_regs_struct,
    x64: x64::user_regs_struct,
}

impl RegistersUnion {
    pub fn default() -> RegistersUnion {
        RegistersUnion {
            x64: x64::user_regs_struct::default(),
        }
    }
}

/// The ptrace register file of a tracee, tagged by the tracee's architecture.
/// Syscall arguments and results are accessed through the kernel's
/// calling-convention names (arg1..arg6, syscall result) so the recording
/// core never mentions concrete registers.
#[derive(Copy, Clone)]
pub struct Registers {
    arch_: SupportedArch,
    u: RegistersUnion,
}

impl Registers {
    pub fn new(arch: SupportedArch) -> Registers {
        Registers {
            arch_: arch,
            u: RegistersUnion::default(),
        }
    }

    pub fn arch(&self) -> SupportedArch {
        self.arch_
    }

    pub fn syscallno(&self) -> isize {
        rt_get_reg_signed!(self, eax, rax)
    }

    pub fn set_syscallno(&mut self, syscallno: isize) {
        rt_set_reg!(self, eax, rax, syscallno)
    }

    pub fn syscall_result(&self) -> usize {
        rt_get_reg!(self, eax, rax)
    }

    pub fn syscall_result_signed(&self) -> isize {
        rt_get_reg_signed!(self, eax, rax)
    }

    pub fn set_syscall_result(&mut self, syscall_result: usize) {
        rt_set_reg!(self, eax, rax, syscall_result);
    }

    pub fn set_syscall_result_signed(&mut self, syscall_result: isize) {
        rt_set_reg!(self, eax, rax, syscall_result);
    }

    pub fn set_syscall_result_from_remote_ptr<T>(&mut self, syscall_result: RemotePtr<T>) {
        rt_set_reg!(self, eax, rax, syscall_result.as_usize());
    }

    pub fn original_syscallno(&self) -> isize {
        rt_get_reg_signed!(self, orig_eax, orig_rax)
    }

    pub fn set_original_syscallno(&mut self, syscallno: usize) {
        rt_set_reg!(self, orig_eax, orig_rax, syscallno);
    }

    pub fn syscall_failed(&self) -> bool {
        let result = self.syscall_result_signed();
        -4096 < result && result < 0
    }

    pub fn syscall_may_restart(&self) -> bool {
        match -self.syscall_result_signed() as u32 {
            ERESTART_RESTARTBLOCK | ERESTARTNOINTR | ERESTARTNOHAND | ERESTARTSYS => true,
            _ => false,
        }
    }

    pub fn ip(&self) -> RemotePtr<Void> {
        RemotePtr::new_from_val(rt_get_reg!(self, eip, rip))
    }

    pub fn set_ip(&mut self, addr: RemotePtr<Void>) {
        rt_set_reg!(self, eip, rip, addr.as_usize());
    }

    pub fn sp(&self) -> RemotePtr<Void> {
        RemotePtr::new_from_val(rt_get_reg!(self, esp, rsp))
    }

    pub fn set_sp(&mut self, addr: RemotePtr<Void>) {
        rt_set_reg!(self, esp, rsp, addr.as_usize());
    }

    pub fn arg1(&self) -> usize {
        rt_get_reg!(self, ebx, rdi)
    }
    pub fn arg1_signed(&self) -> isize {
        rt_get_reg_signed!(self, ebx, rdi)
    }
    pub fn set_arg1(&mut self, value: usize) {
        rt_set_reg!(self, ebx, rdi, value);
    }
    pub fn set_arg1_from_remote_ptr<T>(&mut self, value: RemotePtr<T>) {
        rt_set_reg!(self, ebx, rdi, value.as_usize());
    }

    pub fn arg2(&self) -> usize {
        rt_get_reg!(self, ecx, rsi)
    }
    pub fn arg2_signed(&self) -> isize {
        rt_get_reg_signed!(self, ecx, rsi)
    }
    pub fn set_arg2(&mut self, value: usize) {
        rt_set_reg!(self, ecx, rsi, value);
    }
    pub fn set_arg2_from_remote_ptr<T>(&mut self, value: RemotePtr<T>) {
        rt_set_reg!(self, ecx, rsi, value.as_usize());
    }

    pub fn arg3(&self) -> usize {
        rt_get_reg!(self, edx, rdx)
    }
    pub fn arg3_signed(&self) -> isize {
        rt_get_reg_signed!(self, edx, rdx)
    }
    pub fn set_arg3(&mut self, value: usize) {
        rt_set_reg!(self, edx, rdx, value);
    }

    pub fn arg4(&self) -> usize {
        rt_get_reg!(self, esi, r10)
    }
    pub fn arg4_signed(&self) -> isize {
        rt_get_reg_signed!(self, esi, r10)
    }
    pub fn set_arg4(&mut self, value: usize) {
        rt_set_reg!(self, esi, r10, value);
    }

    pub fn arg5(&self) -> usize {
        rt_get_reg!(self, edi, r8)
    }
    pub fn arg5_signed(&self) -> isize {
        rt_get_reg_signed!(self, edi, r8)
    }
    pub fn set_arg5(&mut self, value: usize) {
        rt_set_reg!(self, edi, r8, value);
    }

    pub fn arg6(&self) -> usize {
        rt_get_reg!(self, ebp, r9)
    }
    pub fn arg6_signed(&self) -> isize {
        rt_get_reg_signed!(self, ebp, r9)
    }
    pub fn set_arg6(&mut self, value: usize) {
        rt_set_reg!(self, ebp, r9, value);
    }

    pub fn arg(&self, index: i32) -> usize {
        match index {
            1 => self.arg1(),
            2 => self.arg2(),
            3 => self.arg3(),
            4 => self.arg4(),
            5 => self.arg5(),
            6 => self.arg6(),
            _ => {
                debug_assert!(false, "Argument index out of range");
                0
            }
        }
    }

    pub fn set_arg(&mut self, index: i32, value: usize) {
        match index {
            1 => self.set_arg1(value),
            2 => self.set_arg2(value),
            3 => self.set_arg3(value),
            4 => self.set_arg4(value),
            5 => self.set_arg5(value),
            6 => self.set_arg6(value),
            _ => debug_assert!(false, "Argument index out of range"),
        }
    }

    /// Dump the register file in a /proc-ish format, for diagnostics right
    /// before aborting.
    pub fn write_register_file(&self, f: &mut dyn Write) -> std::io::Result<()> {
        write!(f, "Printing register file:\n")?;
        match self.arch_ {
            X86 => {
                let r = unsafe { self.u.x86 };
                write!(
                    f,
                    "eax:{:#x} ebx:{:#x} ecx:{:#x} edx:{:#x} esi:{:#x} edi:{:#x} ebp:{:#x}\n\
                     eip:{:#x} esp:{:#x} eflags:{:#x} orig_eax:{:#x}\n",
                    r.eax, r.ebx, r.ecx, r.edx, r.esi, r.edi, r.ebp, r.eip, r.esp, r.eflags,
                    r.orig_eax
                )?;
            }
            X64 => {
                let r = unsafe { self.u.x64 };
                write!(
                    f,
                    "rax:{:#x} rbx:{:#x} rcx:{:#x} rdx:{:#x} rsi:{:#x} rdi:{:#x} rbp:{:#x}\n\
                     r8:{:#x} r9:{:#x} r10:{:#x} r11:{:#x} r12:{:#x} r13:{:#x} r14:{:#x} r15:{:#x}\n\
                     rip:{:#x} rsp:{:#x} eflags:{:#x} orig_rax:{:#x}\n",
                    r.rax,
                    r.rbx,
                    r.rcx,
                    r.rdx,
                    r.rsi,
                    r.rdi,
                    r.rbp,
                    r.r8,
                    r.r9,
                    r.r10,
                    r.r11,
                    r.r12,
                    r.r13,
                    r.r14,
                    r.r15,
                    r.rip,
                    r.rsp,
                    r.eflags,
                    r.orig_rax
                )?;
            }
        }
        Ok(())
    }
}

impl Debug for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Registers {{ arch: {:?}, syscallno: {}, args: [{:#x}, {:#x}, {:#x}, {:#x}, {:#x}, {:#x}] }}",
            self.arch_,
            self.original_syscallno(),
            self.arg1(),
            self.arg2(),
            self.arg3(),
            self.arg4(),
            self.arg5(),
            self.arg6()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_accessors_roundtrip() {
        for &arch in &[X86, X64] {
            let mut r = Registers::new(arch);
            for i in 1..=6 {
                r.set_arg(i, 0x1000 + i as usize);
            }
            for i in 1..=6 {
                assert_eq!(0x1000 + i as usize, r.arg(i));
            }
        }
    }

    #[test]
    fn syscall_result_sign_handling() {
        let mut r = Registers::new(X64);
        r.set_syscall_result_signed(-(libc::ENOENT as isize));
        assert!(r.syscall_failed());
        assert_eq!(-(libc::ENOENT as isize), r.syscall_result_signed());

        let mut r32 = Registers::new(X86);
        r32.set_syscall_result_signed(-(libc::EINVAL as isize));
        assert!(r32.syscall_failed());
        assert_eq!(-(libc::EINVAL as isize), r32.syscall_result_signed());
    }

    #[test]
    fn x86_values_are_truncated_to_32_bits() {
        let mut r = Registers::new(X86);
        r.set_arg1(0x1_0000_0001);
        assert_eq!(1, r.arg1());
    }

    #[test]
    fn restart_detection() {
        let mut r = Registers::new(X64);
        r.set_syscall_result_signed(-(ERESTARTSYS as isize));
        assert!(r.syscall_may_restart());
        r.set_syscall_result_signed(-(libc::EINTR as isize));
        assert!(!r.syscall_may_restart());
    }
}
