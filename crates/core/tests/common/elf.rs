//! Hand-assembled ELF images shared by the core and CLI test suites.
#![allow(dead_code)]

/// One section of a hand-assembled ELF64 fixture.
pub struct ElfSection {
    pub name: &'static str,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub data: Vec<u8>,
    /// Size for `SHT_NOBITS` sections, which carry no data.
    pub nobits_size: u64,
}

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_NOBITS: u32 = 8;

pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;

pub const R_X86_64_RELATIVE: u64 = 8;

impl ElfSection {
    pub fn progbits(name: &'static str, flags: u64, addr: u64, data: Vec<u8>) -> Self {
        Self { name, sh_type: SHT_PROGBITS, flags, addr, data, nobits_size: 0 }
    }

    pub fn words(name: &'static str, flags: u64, addr: u64, words: &[u64]) -> Self {
        Self::progbits(name, flags, addr, words.iter().flat_map(|w| w.to_le_bytes()).collect())
    }

    pub fn nobits(name: &'static str, flags: u64, addr: u64, size: u64) -> Self {
        Self { name, sh_type: SHT_NOBITS, flags, addr, data: Vec::new(), nobits_size: size }
    }
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn add_name(shstrtab: &mut Vec<u8>, name: &str) -> u32 {
    let offset = shstrtab.len() as u32;
    shstrtab.extend_from_slice(name.as_bytes());
    shstrtab.push(0);
    offset
}

fn align8(out: &mut Vec<u8>) {
    while out.len() % 8 != 0 {
        out.push(0);
    }
}

/// Assemble a little-endian x86-64 ELF64 shared object from `sections`,
/// plus a `.rela.dyn` table holding `relocations` as
/// `(offset, addend)` pairs of `R_X86_64_RELATIVE` type.
///
/// No program headers are emitted; the loader maps sections by address.
pub fn build_elf64(sections: &[ElfSection], relocations: &[(u64, i64)]) -> Vec<u8> {
    const EHDR_SIZE: usize = 64;
    const SHDR_SIZE: u16 = 64;

    let mut rela = Vec::new();
    for &(offset, addend) in relocations {
        push_u64(&mut rela, offset);
        push_u64(&mut rela, R_X86_64_RELATIVE);
        rela.extend_from_slice(&addend.to_le_bytes());
    }

    // Layout: header, section payloads, .rela.dyn, .shstrtab, section headers.
    let mut body = vec![0u8; EHDR_SIZE];
    let mut shstrtab = vec![0u8];
    let mut headers: Vec<(u32, u32, u64, u64, u64, u64, u64)> = Vec::new();

    for section in sections {
        align8(&mut body);
        let name = add_name(&mut shstrtab, section.name);
        let offset = body.len() as u64;
        let size = if section.sh_type == SHT_NOBITS {
            section.nobits_size
        } else {
            body.extend_from_slice(&section.data);
            section.data.len() as u64
        };
        headers.push((name, section.sh_type, section.flags, section.addr, offset, size, 0));
    }

    align8(&mut body);
    let rela_name = add_name(&mut shstrtab, ".rela.dyn");
    let rela_offset = body.len() as u64;
    body.extend_from_slice(&rela);
    headers.push((rela_name, SHT_RELA, 0, 0, rela_offset, rela.len() as u64, 24));

    let shstrtab_name = add_name(&mut shstrtab, ".shstrtab");
    let shstrtab_offset = body.len() as u64;
    let shstrtab_len = shstrtab.len() as u64;
    body.extend_from_slice(&shstrtab);
    headers.push((shstrtab_name, SHT_STRTAB, 0, 0, shstrtab_offset, shstrtab_len, 0));

    align8(&mut body);
    let shoff = body.len() as u64;
    let shnum = headers.len() as u16 + 1;
    let shstrndx = shnum - 1;

    // Null section header.
    body.extend_from_slice(&[0u8; SHDR_SIZE as usize]);
    for (name, sh_type, flags, addr, offset, size, entsize) in headers {
        push_u32(&mut body, name);
        push_u32(&mut body, sh_type);
        push_u64(&mut body, flags);
        push_u64(&mut body, addr);
        push_u64(&mut body, offset);
        push_u64(&mut body, size);
        push_u32(&mut body, 0); // sh_link
        push_u32(&mut body, 0); // sh_info
        push_u64(&mut body, 8); // sh_addralign
        push_u64(&mut body, entsize);
    }

    let mut ehdr = Vec::with_capacity(EHDR_SIZE);
    ehdr.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    ehdr.extend_from_slice(&[0u8; 8]);
    push_u16(&mut ehdr, 3); // ET_DYN
    push_u16(&mut ehdr, 62); // EM_X86_64
    push_u32(&mut ehdr, 1);
    push_u64(&mut ehdr, 0); // e_entry
    push_u64(&mut ehdr, 0); // e_phoff
    push_u64(&mut ehdr, shoff);
    push_u32(&mut ehdr, 0); // e_flags
    push_u16(&mut ehdr, EHDR_SIZE as u16);
    push_u16(&mut ehdr, 56); // e_phentsize
    push_u16(&mut ehdr, 0); // e_phnum
    push_u16(&mut ehdr, SHDR_SIZE);
    push_u16(&mut ehdr, shnum);
    push_u16(&mut ehdr, shstrndx);
    body[..EHDR_SIZE].copy_from_slice(&ehdr);

    body
}

/// Minimal 32-bit ELF header with no sections.
pub fn build_elf32_header() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0u8; 8]);
    push_u16(&mut out, 2); // ET_EXEC
    push_u16(&mut out, 3); // EM_386
    push_u32(&mut out, 1);
    push_u32(&mut out, 0); // e_entry
    push_u32(&mut out, 0); // e_phoff
    push_u32(&mut out, 0); // e_shoff
    push_u32(&mut out, 0); // e_flags
    push_u16(&mut out, 52);
    push_u16(&mut out, 32);
    push_u16(&mut out, 0);
    push_u16(&mut out, 40);
    push_u16(&mut out, 0);
    push_u16(&mut out, 0);
    out
}

/// Text bytes: a `lea rax, [rip + disp]` at offset 0 referencing `target`,
/// zero padding afterwards.
pub fn text_with_lea(text_start: u64, size: usize, target: u64) -> Vec<u8> {
    let mut text = vec![0u8; size];
    let next = text_start + 7;
    let disp = (target as i64 - next as i64) as i32;
    text[..3].copy_from_slice(&[0x48, 0x8d, 0x05]);
    text[3..7].copy_from_slice(&disp.to_le_bytes());
    text
}

/// Small executable fixture with one Itanium vtable at 0x2010.
///
/// - `.text` `[0x1000, 0x1040)` with a RIP-relative reference to 0x2010
/// - `.rodata` at 0x2000: `0, 0, 0x1010, 0x1020, 0`
/// - `.got` at 0x3000 with two slots, `.bss` at 0x4000
/// - one `R_X86_64_RELATIVE` relocation at 0x3000
pub fn vtable_elf_fixture() -> Vec<u8> {
    build_elf64(
        &[
            ElfSection::progbits(
                ".text",
                SHF_ALLOC | SHF_EXECINSTR,
                0x1000,
                text_with_lea(0x1000, 0x40, 0x2010),
            ),
            ElfSection::words(".rodata", SHF_ALLOC, 0x2000, &[0, 0, 0x1010, 0x1020, 0]),
            ElfSection::words(".got", SHF_ALLOC | SHF_WRITE, 0x3000, &[0x1010, 0]),
            ElfSection::nobits(".bss", SHF_ALLOC | SHF_WRITE, 0x4000, 0x10),
        ],
        &[(0x3000, 0x1010)],
    )
}
