//! In-memory PDF fixture shared by unit and integration tests.

/// Minimal valid PDF with one page per entry of `pages`, each drawing its
/// text in Helvetica. Offsets in the xref table are computed from the body.
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let font_id = 3 + 2 * page_count;
    let mut offsets = Vec::new();
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            page_count
        )
        .as_bytes(),
    );

    for (i, text) in pages.iter().enumerate() {
        let page_id = 3 + 2 * i;
        let content_id = page_id + 1;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{page_id} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Contents {content_id} 0 R /Resources << /Font << /F1 {font_id} 0 R >> >> >> endobj\n"
            )
            .as_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 72 700 Td ({text}) Tj ET");
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{content_id} 0 obj << /Length {} >> stream\n{stream}\nendstream endobj\n",
                stream.len()
            )
            .as_bytes(),
        );
    }

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "{font_id} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n"
        )
        .as_bytes(),
    );

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}
