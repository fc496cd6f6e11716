use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use memmap2::Mmap;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use subsetter::GlyphRemapper;
use ttf_parser::Face;

/// Bold/italic combination of the document font family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Variant {
    pub(crate) bold: bool,
    pub(crate) italic: bool,
}

impl Variant {
    pub(crate) const ALL: [Variant; 4] = [
        Variant { bold: false, italic: false },
        Variant { bold: true, italic: false },
        Variant { bold: false, italic: true },
        Variant { bold: true, italic: true },
    ];

    fn index(self) -> usize {
        (self.bold as usize) | ((self.italic as usize) << 1)
    }
}

pub(crate) type UsedChars = HashMap<Variant, HashSet<char>>;

/// The PDF standard fonts usable without embedding.
#[derive(Clone, Copy, Debug, PartialEq)]
enum StandardFamily {
    Helvetica,
    Times,
    Courier,
}

impl StandardFamily {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" => Some(StandardFamily::Helvetica),
            "times" | "times-roman" => Some(StandardFamily::Times),
            "courier" => Some(StandardFamily::Courier),
            _ => None,
        }
    }

    fn base_font(self, v: Variant) -> &'static str {
        match (self, v.bold, v.italic) {
            (StandardFamily::Helvetica, false, false) => "Helvetica",
            (StandardFamily::Helvetica, true, false) => "Helvetica-Bold",
            (StandardFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (StandardFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (StandardFamily::Times, false, false) => "Times-Roman",
            (StandardFamily::Times, true, false) => "Times-Bold",
            (StandardFamily::Times, false, true) => "Times-Italic",
            (StandardFamily::Times, true, true) => "Times-BoldItalic",
            (StandardFamily::Courier, false, false) => "Courier",
            (StandardFamily::Courier, true, false) => "Courier-Bold",
            (StandardFamily::Courier, false, true) => "Courier-Oblique",
            (StandardFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// Rough 1000-unit advance of `ch`, by character class.
    fn char_width(self, bold: bool, ch: char) -> f32 {
        if self == StandardFamily::Courier {
            return 600.0;
        }
        let base = match ch {
            ' ' | 'I' | 'J' | 'f' | 'i' | 'j' | 'l' | 't' => 278.0,
            'M' | 'm' | 'w' => 833.0,
            'A'..='Z' => 667.0,
            '!'..='/' | ':'..='@' | '['..='`' => 333.0,
            _ => 556.0,
        };
        let scale = match (self, bold) {
            (StandardFamily::Times, false) => 0.9,
            (StandardFamily::Times, true) => 0.95,
            (_, true) => 1.05,
            _ => 1.0,
        };
        base * scale
    }
}

struct TrueTypeSource {
    family: String,
    data: Vec<u8>,
    face_index: u32,
}

enum FaceSource {
    Standard(StandardFamily, Variant),
    TrueType(TrueTypeSource),
}

/// Metrics of one face, loaded before layout so measuring never touches the PDF.
pub(crate) struct FontFace {
    source: FaceSource,
    /// Advances of every char the document uses, for embedded faces.
    advances: HashMap<char, f32>,
    pub(crate) line_h_ratio: f32,
    pub(crate) ascender_ratio: f32,
}

impl FontFace {
    fn standard(family: StandardFamily, v: Variant) -> Self {
        FontFace {
            source: FaceSource::Standard(family, v),
            advances: HashMap::new(),
            line_h_ratio: 1.2,
            ascender_ratio: 0.75,
        }
    }

    fn truetype(family: &str, data: Vec<u8>, face_index: u32, chars: &HashSet<char>) -> Option<Self> {
        let face = Face::parse(&data, face_index).ok()?;
        let per_em = face.units_per_em() as f32;
        let advances = chars
            .iter()
            .map(|&ch| (ch, glyph_advance(&face, ch).unwrap_or(0.0)))
            .collect();
        let line_h_ratio =
            (face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32) / per_em;
        let ascender_ratio = face.ascender() as f32 / per_em;
        drop(face);

        Some(FontFace {
            source: FaceSource::TrueType(TrueTypeSource {
                family: family.to_string(),
                data,
                face_index,
            }),
            advances,
            line_h_ratio,
            ascender_ratio,
        })
    }

    /// Advance of `ch` in 1000-units. Chars a standard font cannot encode are
    /// dropped when drawn, so they measure zero.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        match &self.source {
            FaceSource::Standard(family, v) => {
                if char_to_winansi(ch) == 0 {
                    0.0
                } else {
                    family.char_width(v.bold, ch)
                }
            }
            FaceSource::TrueType(_) => self.advances.get(&ch).copied().unwrap_or(556.0),
        }
    }

    pub(crate) fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars().map(|ch| self.char_width_1000(ch)).sum::<f32>() * font_size / 1000.0
    }

    pub(crate) fn space_width(&self, font_size: f32) -> f32 {
        self.char_width_1000(' ') * font_size / 1000.0
    }
}

fn glyph_advance(face: &Face, ch: char) -> Option<f32> {
    let gid = face.glyph_index(ch)?;
    let advance = face.glyph_hor_advance(gid)?;
    Some(advance as f32 * 1000.0 / face.units_per_em() as f32)
}

/// Regular, bold, italic and bold-italic faces of the document family.
pub(crate) struct FontSet {
    faces: Vec<FontFace>,
}

impl FontSet {
    /// Resolve `family` for each variant. Standard families never hit the disk;
    /// anything else is looked up in the font directories and falls back to
    /// Helvetica when missing.
    pub(crate) fn load(family: &str, used_chars: &UsedChars) -> FontSet {
        let t0 = Instant::now();
        let standard = StandardFamily::from_name(family);
        let no_chars = HashSet::new();
        let faces = Variant::ALL
            .iter()
            .map(|&v| {
                if let Some(std_family) = standard {
                    return FontFace::standard(std_family, v);
                }
                let chars = used_chars.get(&v).unwrap_or(&no_chars);
                FontIndex::global()
                    .find(family, v)
                    .and_then(|loc| {
                        let data = std::fs::read(&loc.path).ok()?;
                        FontFace::truetype(family, data, loc.index, chars)
                    })
                    .unwrap_or_else(|| {
                        log::warn!(
                            "Font not found: {family} bold={} italic={}, using Helvetica",
                            v.bold,
                            v.italic
                        );
                        FontFace::standard(StandardFamily::Helvetica, v)
                    })
            })
            .collect();
        log::debug!(
            "Loaded font family {family} in {:.1}ms",
            t0.elapsed().as_secs_f64() * 1000.0
        );
        FontSet { faces }
    }

    pub(crate) fn face(&self, bold: bool, italic: bool) -> &FontFace {
        &self.faces[Variant { bold, italic }.index()]
    }

    /// Write the faces into `pdf`, subsetting embedded fonts to the chars
    /// measured at load time.
    pub(crate) fn embed(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) -> Vec<EmbeddedFont> {
        Variant::ALL
            .iter()
            .map(|&v| {
                let face = &self.faces[v.index()];
                let font_ref = alloc();
                let char_to_gid = match &face.source {
                    FaceSource::Standard(family, sv) => {
                        write_standard_font(pdf, font_ref, family.base_font(*sv));
                        None
                    }
                    FaceSource::TrueType(src) => {
                        let chars: HashSet<char> = face.advances.keys().copied().collect();
                        let embedded = embed_truetype(pdf, font_ref, src, &chars, alloc);
                        if embedded.is_none() {
                            log::warn!("Embedding {} failed, using Helvetica", src.family);
                            write_standard_font(pdf, font_ref, "Helvetica");
                        }
                        embedded
                    }
                };
                EmbeddedFont {
                    variant: v,
                    pdf_name: format!("F{}", v.index() + 1),
                    font_ref,
                    char_to_gid,
                }
            })
            .collect()
    }
}

fn write_standard_font(pdf: &mut Pdf, font_ref: Ref, base_font: &str) {
    pdf.type1_font(font_ref)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
}

/// A face as written into the PDF, with the encoding its text needs.
pub(crate) struct EmbeddedFont {
    pub(crate) variant: Variant,
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Set for CID fonts; standard fonts take WinAnsi bytes.
    pub(crate) char_to_gid: Option<HashMap<char, u16>>,
}

impl EmbeddedFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

struct FaceLocation {
    path: PathBuf,
    /// Face index inside a collection file.
    index: u32,
}

/// Installed faces keyed by (lowercase family, bold, italic). Built once per
/// process on first lookup.
struct FontIndex {
    faces: HashMap<(String, bool, bool), FaceLocation>,
}

static FONT_INDEX: OnceLock<FontIndex> = OnceLock::new();

impl FontIndex {
    fn global() -> &'static FontIndex {
        FONT_INDEX.get_or_init(|| FontIndex::scan(search_paths()))
    }

    fn scan(roots: Vec<PathBuf>) -> FontIndex {
        let t0 = Instant::now();
        let mut index = FontIndex {
            faces: HashMap::new(),
        };
        let mut pending = roots;
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = 0usize;

        while let Some(dir) = pending.pop() {
            if !seen.insert(dir.clone()) {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for path in entries.flatten().map(|e| e.path()) {
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(kind) = font_file_kind(&path) {
                    files += 1;
                    index.add_file(&path, kind == FontFileKind::Collection);
                }
            }
        }

        log::info!(
            "Font scan: {:.1}ms, {files} files, {} faces",
            t0.elapsed().as_secs_f64() * 1000.0,
            index.faces.len(),
        );
        index
    }

    fn add_file(&mut self, path: &Path, collection: bool) {
        let Ok(file) = File::open(path) else {
            return;
        };
        let Ok(data) = (unsafe { Mmap::map(&file) }) else {
            return;
        };
        let count = if collection {
            ttf_parser::fonts_in_collection(&data).unwrap_or(1)
        } else {
            1
        };
        for index in 0..count {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            let Some(family) = family_name(&face) else {
                continue;
            };
            self.faces
                .entry((family.to_lowercase(), face.is_bold(), face.is_italic()))
                .or_insert_with(|| FaceLocation {
                    path: path.to_path_buf(),
                    index,
                });
        }
    }

    /// Exact style first, then the family's regular face.
    fn find(&self, family: &str, v: Variant) -> Option<&FaceLocation> {
        let key = family.trim().to_lowercase();
        self.faces
            .get(&(key.clone(), v.bold, v.italic))
            .or_else(|| self.faces.get(&(key, false, false)))
    }
}

#[derive(PartialEq)]
enum FontFileKind {
    Single,
    Collection,
}

fn font_file_kind(path: &Path) -> Option<FontFileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ttf" | "otf" => Some(FontFileKind::Single),
        "ttc" => Some(FontFileKind::Collection),
        _ => None,
    }
}

fn family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
        .find_map(|n| n.to_string())
}

/// `PROTOTYPER_FONTS` entries first, then the platform font directories.
fn search_paths() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PROTOTYPER_FONTS")
        .map(|v| {
            std::env::split_paths(&v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    let home = std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "macos") {
        dirs.extend(
            ["/Library/Fonts", "/System/Library/Fonts", "/System/Library/Fonts/Supplemental"]
                .map(PathBuf::from),
        );
        dirs.extend(home.map(|h| h.join("Library/Fonts")));
    } else if cfg!(windows) {
        let windir = std::env::var_os("WINDIR").map_or_else(|| PathBuf::from(r"C:\Windows"), PathBuf::from);
        dirs.push(windir.join("Fonts"));
    } else {
        dirs.extend(["/usr/share/fonts", "/usr/local/share/fonts"].map(PathBuf::from));
        dirs.extend(home.map(|h| h.join(".local/share/fonts")));
    }
    dirs
}

/// Windows-1252 code for `c`, or 0 when it has none.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars().map(char_to_winansi).filter(|&b| b != 0).collect()
}

/// Big-endian 2-byte glyph ids for Identity-H text. Unknown chars map to .notdef.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    text.chars()
        .flat_map(|ch| char_to_gid.get(&ch).copied().unwrap_or(0).to_be_bytes())
        .collect()
}

const IDENTITY: SystemInfo<'static> = SystemInfo {
    registry: Str(b"Adobe"),
    ordering: Str(b"Identity"),
    supplement: 0,
};

/// The glyphs one face contributes to the document, renumbered densely.
struct GlyphSubset {
    remapper: GlyphRemapper,
    char_to_gid: HashMap<char, u16>,
    /// (new gid, advance in 1000-units), sorted by gid.
    widths: Vec<(u16, f32)>,
}

impl GlyphSubset {
    fn new(face: &Face, chars: &HashSet<char>) -> Self {
        let mut remapper = GlyphRemapper::new();
        let mut char_to_gid = HashMap::new();
        let mut widths = Vec::new();
        for &ch in chars {
            let Some(gid) = face.glyph_index(ch) else {
                continue;
            };
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            widths.push((new_gid, glyph_advance(face, ch).unwrap_or(0.0)));
        }
        widths.sort_by_key(|&(gid, _)| gid);
        widths.dedup_by_key(|&mut (gid, _)| gid);
        GlyphSubset {
            remapper,
            char_to_gid,
            widths,
        }
    }
}

/// Write `src` as a Type0 font over a TrueType CIDFont with Identity-H
/// encoding, subset to `chars`. Returns the char to glyph id map text must be
/// encoded with.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    src: &TrueTypeSource,
    chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<HashMap<char, u16>> {
    let face = Face::parse(&src.data, src.face_index).ok()?;
    let subset = GlyphSubset::new(&face, chars);
    let font_data = subsetter::subset(&src.data, src.face_index, &subset.remapper)
        .unwrap_or_else(|e| {
            log::warn!("Subsetting {} failed ({e}), embedding the whole font", src.family);
            src.data.clone()
        });
    let ps_name = src.family.replace(' ', "");

    let font_file_ref = alloc();
    let descriptor_ref = alloc();
    let cid_ref = alloc();
    let cmap_ref = alloc();

    pdf.stream(font_file_ref, &font_data)
        .pair(Name(b"Length1"), i32::try_from(font_data.len()).ok()?);
    write_descriptor(pdf, descriptor_ref, &face, &ps_name, font_file_ref);

    {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(ps_name.as_bytes()))
            .system_info(IDENTITY)
            .font_descriptor(descriptor_ref)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        if !subset.widths.is_empty() {
            let mut widths = cid.widths();
            for &(gid, w) in &subset.widths {
                widths.consecutive(gid, [w]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), IDENTITY);
    for (&ch, &gid) in &subset.char_to_gid {
        cmap.pair(gid, ch);
    }
    pdf.stream(cmap_ref, cmap.finish().as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    Some(subset.char_to_gid)
}

fn write_descriptor(pdf: &mut Pdf, id: Ref, face: &Face, ps_name: &str, font_file: Ref) {
    let scale = 1000.0 / face.units_per_em() as f32;
    let bb = face.global_bounding_box();
    pdf.font_descriptor(id)
        .name(Name(ps_name.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            bb.x_min as f32 * scale,
            bb.y_min as f32 * scale,
            bb.x_max as f32 * scale,
            bb.y_max as f32 * scale,
        ))
        .italic_angle(if face.is_italic() { -12.0 } else { 0.0 })
        .ascent(face.ascender() as f32 * scale)
        .descent(face.descender() as f32 * scale)
        .cap_height(face.capital_height().map_or(700.0, |h| h as f32 * scale))
        .stem_v(if face.is_bold() { 120.0 } else { 80.0 })
        .font_file2(font_file);
}
