/// Preferred load address of [`build_pe64`] images.
pub const PE_IMAGE_BASE: u64 = 0x1_4000_0000;

const PE_HEADER_OFFSET: usize = 0x80;
const OPTIONAL_HEADER_SIZE: u16 = 240;
const FILE_ALIGNMENT: u32 = 0x200;
const HEADERS_SIZE: u32 = 0x400;

pub const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;

/// One section of a hand-assembled PE32+ fixture.
pub struct PeSection {
    pub name: &'static str,
    pub virtual_address: u32,
    /// Written to the header as-is, even when it disagrees with `data`.
    pub virtual_size: u32,
    pub characteristics: u32,
    pub data: Vec<u8>,
}

impl PeSection {
    pub fn words(name: &'static str, virtual_address: u32, characteristics: u32, words: &[u64]) -> Self {
        let data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let virtual_size = data.len() as u32;
        Self { name, virtual_address, virtual_size, characteristics, data }
    }

    pub fn with_virtual_size(mut self, virtual_size: u32) -> Self {
        self.virtual_size = virtual_size;
        self
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

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Assemble an x86-64 PE32+ DLL at [`PE_IMAGE_BASE`] with `sections` and
/// an image size of `size_of_image`. No data directories are populated.
pub fn build_pe64(sections: &[PeSection], size_of_image: u32) -> Vec<u8> {
    let mut out = vec![0u8; PE_HEADER_OFFSET];
    out[..2].copy_from_slice(b"MZ");
    out[0x3c..0x40].copy_from_slice(&(PE_HEADER_OFFSET as u32).to_le_bytes());

    out.extend_from_slice(b"PE\0\0");
    // COFF file header.
    push_u16(&mut out, 0x8664); // IMAGE_FILE_MACHINE_AMD64
    push_u16(&mut out, sections.len() as u16);
    push_u32(&mut out, 0); // TimeDateStamp
    push_u32(&mut out, 0); // PointerToSymbolTable
    push_u32(&mut out, 0); // NumberOfSymbols
    push_u16(&mut out, OPTIONAL_HEADER_SIZE);
    push_u16(&mut out, 0x2022); // EXECUTABLE_IMAGE | LARGE_ADDRESS_AWARE | DLL

    // Optional header, standard fields.
    push_u16(&mut out, 0x20b); // PE32+
    out.extend_from_slice(&[14, 0]); // linker version
    push_u32(&mut out, 0); // SizeOfCode
    push_u32(&mut out, 0); // SizeOfInitializedData
    push_u32(&mut out, 0); // SizeOfUninitializedData
    push_u32(&mut out, 0); // AddressOfEntryPoint
    push_u32(&mut out, 0x1000); // BaseOfCode

    // Windows-specific fields.
    push_u64(&mut out, PE_IMAGE_BASE);
    push_u32(&mut out, 0x1000); // SectionAlignment
    push_u32(&mut out, FILE_ALIGNMENT);
    for version in [6u16, 0, 0, 0, 6, 0] {
        push_u16(&mut out, version);
    }
    push_u32(&mut out, 0); // Win32VersionValue
    push_u32(&mut out, size_of_image);
    push_u32(&mut out, HEADERS_SIZE);
    push_u32(&mut out, 0); // CheckSum
    push_u16(&mut out, 3); // IMAGE_SUBSYSTEM_WINDOWS_CUI
    push_u16(&mut out, 0); // DllCharacteristics
    for reserve in [0x10_0000u64, 0x1000, 0x10_0000, 0x1000] {
        push_u64(&mut out, reserve);
    }
    push_u32(&mut out, 0); // LoaderFlags
    push_u32(&mut out, 16); // NumberOfRvaAndSizes
    out.extend_from_slice(&[0u8; 16 * 8]);

    let mut raw_offset = HEADERS_SIZE;
    let mut placements = Vec::with_capacity(sections.len());
    for section in sections {
        let raw_size = align_up(section.data.len() as u32, FILE_ALIGNMENT);
        let mut name = [0u8; 8];
        let len = section.name.len().min(8);
        name[..len].copy_from_slice(&section.name.as_bytes()[..len]);

        out.extend_from_slice(&name);
        push_u32(&mut out, section.virtual_size);
        push_u32(&mut out, section.virtual_address);
        push_u32(&mut out, raw_size);
        push_u32(&mut out, raw_offset);
        push_u32(&mut out, 0); // PointerToRelocations
        push_u32(&mut out, 0); // PointerToLinenumbers
        push_u16(&mut out, 0); // NumberOfRelocations
        push_u16(&mut out, 0); // NumberOfLinenumbers
        push_u32(&mut out, section.characteristics);

        placements.push((raw_offset as usize, raw_size as usize));
        raw_offset += raw_size;
    }

    out.resize(raw_offset as usize, 0);
    for (section, (offset, _)) in sections.iter().zip(&placements) {
        out[*offset..*offset + section.data.len()].copy_from_slice(&section.data);
    }
    out
}

/// PE32+ image with one MSVC vtable at `PE_IMAGE_BASE + 0x2008`:
///
/// - `.text` at RVA 0x1000 holding two `ret` stubs
/// - `.rdata` at RVA 0x2000: locator pointer, one code pointer, and an
///   all-zero Complete Object Locator at RVA 0x2100
///
/// `.rdata` declares `rdata_virtual_size` in its header; the image itself
/// is 0x3000 bytes.
pub fn msvc_pe_fixture(rdata_virtual_size: u32) -> Vec<u8> {
    let mut rdata = vec![0u64; 0x20 + 3];
    rdata[0] = PE_IMAGE_BASE + 0x2100;
    rdata[1] = PE_IMAGE_BASE + 0x1000;

    build_pe64(
        &[
            PeSection {
                name: ".text",
                virtual_address: 0x1000,
                virtual_size: 0x10,
                characteristics: IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_MEM_READ,
                data: vec![0xC3; 0x10],
            },
            PeSection::words(
                ".rdata",
                0x2000,
                IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ,
                &rdata,
            )
            .with_virtual_size(rdata_virtual_size),
        ],
        0x3000,
    )
}
