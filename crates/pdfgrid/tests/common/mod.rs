//! In-memory PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use lopdf::{Object, Stream, StringFormat, dictionary};

/// A US Letter document with one page per content stream.
///
/// Every page gets the same resources: `/F1` Helvetica and `/F2` Courier.
pub fn build_pdf(contents: &[Vec<u8>]) -> Vec<u8> {
    save(build_document(contents))
}

fn build_document(contents: &[Vec<u8>]) -> lopdf::Document {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let courier = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::with_capacity(contents.len());
    for content in contents {
        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, content.clone())));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => Object::Reference(helvetica),
                    "F2" => Object::Reference(courier),
                },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: lopdf::Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// PDF standard padding bytes used in encryption key derivation.
const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j = 0usize;
    for i in 0..256 {
        j = (j + s[i] as usize + key[i % key.len()] as usize) & 0xFF;
        s.swap(i, j);
    }
    let (mut i, mut j) = (0usize, 0usize);
    data.iter()
        .map(|&byte| {
            i = (i + 1) & 0xFF;
            j = (j + s[i] as usize) & 0xFF;
            s.swap(i, j);
            byte ^ s[(s[i] as usize + s[j] as usize) & 0xFF]
        })
        .collect()
}

/// Like [`build_pdf`], encrypted with 40-bit RC4 (V=1, R=2) under
/// `user_password`, which also serves as the owner password.
pub fn build_encrypted_pdf(contents: &[Vec<u8>], user_password: &str) -> Vec<u8> {
    let file_id = b"pdfgridfacade001";
    let permissions: i32 = -4;

    let pw = user_password.as_bytes();
    let pw_len = pw.len().min(32);
    let mut padded = pw[..pw_len].to_vec();
    padded.extend_from_slice(&PAD_BYTES[..32 - pw_len]);

    let owner_key = md5::compute(&padded);
    let o_value = rc4(&owner_key[..5], &padded);

    let mut key_input = padded.clone();
    key_input.extend_from_slice(&o_value);
    key_input.extend_from_slice(&(permissions as u32).to_le_bytes());
    key_input.extend_from_slice(file_id);
    let key = md5::compute(&key_input)[..5].to_vec();
    let u_value = rc4(&key, &PAD_BYTES);

    let mut doc = build_document(contents);
    for (&(num, generation), obj) in doc.objects.iter_mut() {
        let mut obj_key_input = key.clone();
        obj_key_input.extend_from_slice(&num.to_le_bytes()[..3]);
        obj_key_input.extend_from_slice(&generation.to_le_bytes()[..2]);
        let digest = md5::compute(&obj_key_input);
        let obj_key = &digest[..key.len() + 5];
        match obj {
            Object::Stream(stream) => {
                let encrypted = rc4(obj_key, &stream.content);
                stream.set_content(encrypted);
            }
            Object::String(content, _) => *content = rc4(obj_key, content),
            _ => {}
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1_i64,
        "R" => 2_i64,
        "Length" => 40_i64,
        "O" => Object::String(o_value, StringFormat::Literal),
        "U" => Object::String(u_value, StringFormat::Literal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Literal),
            Object::String(file_id.to_vec(), StringFormat::Literal),
        ]),
    );
    save(doc)
}

/// Show `text` with its baseline origin at (`x`, `y`) in PDF user space.
pub fn show(ops: &mut String, font: &str, size: f64, x: f64, y: f64, text: &str) {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    ops.push_str(&format!(
        "BT /{font} {size} Tf 1 0 0 1 {x} {y} Tm ({escaped}) Tj ET\n"
    ));
}

/// A ruled grid with its top-left corner at (`x`, `y`) in PDF user space,
/// one row of `cells` per entry, text inset 6pt from the cell's left edge.
pub fn ruled_table(x: f64, y: f64, cell_w: f64, cell_h: f64, cells: &[&[&str]]) -> String {
    let rows = cells.len();
    let cols = cells.first().map_or(0, |r| r.len());
    let (width, height) = (cols as f64 * cell_w, rows as f64 * cell_h);

    let mut ops = String::from("1 w\n");
    for r in 0..=rows {
        let ry = y - r as f64 * cell_h;
        ops.push_str(&format!("{x} {ry} m {} {ry} l S\n", x + width));
    }
    for c in 0..=cols {
        let cx = x + c as f64 * cell_w;
        ops.push_str(&format!("{cx} {y} m {cx} {} l S\n", y - height));
    }
    for (r, row) in cells.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            let tx = x + c as f64 * cell_w + 6.0;
            let ty = y - (r + 1) as f64 * cell_h + cell_h / 3.0;
            show(&mut ops, "F1", 10.0, tx, ty, text);
        }
    }
    ops
}

/// Left-aligned prose, one line every 14pt starting at `y`.
pub fn prose(x: f64, y: f64, lines: &[&str]) -> String {
    let mut ops = String::new();
    for (i, line) in lines.iter().enumerate() {
        show(&mut ops, "F1", 10.0, x, y - i as f64 * 14.0, line);
    }
    ops
}

/// A stroked grid of `n` by `n` cells, `step` points apart, with its
/// top-left corner at (`x`, `y`) in PDF user space.
pub fn dense_grid(x: f64, y: f64, n: usize, step: f64) -> Vec<u8> {
    let size = n as f64 * step;
    let mut ops = String::from("0.5 w\n");
    for i in 0..=n {
        let offset = i as f64 * step;
        let (ry, cx) = (y - offset, x + offset);
        ops.push_str(&format!("{x} {ry} m {} {ry} l S\n", x + size));
        ops.push_str(&format!("{cx} {y} m {cx} {} l S\n", y - size));
    }
    ops.into_bytes()
}

/// A page with `segments` short stroked lines, for exercising time limits.
pub fn heavy_content(segments: usize) -> Vec<u8> {
    let mut ops = String::with_capacity(segments * 16);
    for i in 0..segments {
        let y = (i % 700) as f64 + 50.0;
        ops.push_str(&format!("10 {y} m 20 {y} l S\n"));
    }
    ops.into_bytes()
}
