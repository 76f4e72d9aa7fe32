use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::{DATE_FORMAT, TIME_FORMAT};
use crate::models::{Booking, BookingStatus, Session};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const BOOKINGS_PER_PAGE: usize = 4;
const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const FONT_SIZE: u32 = 11;
const LEADING: u32 = 15;

#[derive(Debug, Clone)]
pub struct Report {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub booking_count: usize,
}

impl Report {
    /// Suggested download name, e.g. `user-bookings-u@x.com-2025-06-16.pdf`.
    /// Characters outside `[A-Za-z0-9@._+-]` become `_` so the name is always
    /// safe inside a quoted `Content-Disposition`.
    pub fn file_name(owner_email: &str, generated_on: NaiveDate) -> String {
        let owner: String = owner_email
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "user-bookings-{owner}-{}.pdf",
            generated_on.format(DATE_FORMAT)
        )
    }
}

/// Builds a PDF summary of the owner's Completed bookings.
pub fn generate_report(
    conn: &Connection,
    requester: &Session,
    owner_email: &str,
    generated_on: NaiveDate,
) -> Result<Report, AppError> {
    if !requester.owns(owner_email) {
        return Err(AppError::Forbidden(
            "reports are only available to the booking owner".to_string(),
        ));
    }

    let completed: Vec<Booking> = queries::list_bookings_for_owner(conn, owner_email)?
        .into_iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .collect();

    if completed.is_empty() {
        return Err(AppError::NoCompletedBookings(owner_email.to_string()));
    }

    tracing::info!(owner = owner_email, count = completed.len(), "generating report");

    Ok(Report {
        content_type: PDF_CONTENT_TYPE,
        bytes: render_pdf(owner_email, generated_on, &completed),
        booking_count: completed.len(),
    })
}

fn booking_lines(index: usize, booking: &Booking) -> Vec<String> {
    vec![
        format!("Service #{index}"),
        format!("  Name: {}", booking.name),
        format!("  Address: {}", booking.address),
        format!("  Phone: {}", booking.phone),
        format!("  Vehicle: {}", booking.vehicle_number),
        format!("  Service: {}", booking.service_type.as_str()),
        format!("  Date: {}", booking.date.format(DATE_FORMAT)),
        format!("  Time: {}", booking.time.format(TIME_FORMAT)),
        format!(
            "  Delivery Date: {}",
            booking
                .delivery_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "Not Assigned".to_string())
        ),
        format!(
            "  Kilometers: {}",
            booking
                .kilometers
                .map(|km| format!("{km}"))
                .unwrap_or_else(|| "Not set".to_string())
        ),
        format!(
            "  Amount: {}",
            booking
                .amount
                .map(|amount| format!("Rs. {amount:.2}"))
                .unwrap_or_else(|| "Not set".to_string())
        ),
    ]
}

fn render_pdf(owner_email: &str, generated_on: NaiveDate, bookings: &[Booking]) -> Vec<u8> {
    let pages: Vec<&[Booking]> = bookings.chunks(BOOKINGS_PER_PAGE).collect();
    let page_count = pages.len();

    // Object layout: 1 catalog, 2 page tree, 3 font, then a (page, contents)
    // pair per page.
    let page_ids: Vec<usize> = (0..page_count).map(|i| 4 + 2 * i).collect();
    let mut objects: Vec<String> = Vec::with_capacity(3 + 2 * page_count);

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>"));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (page_index, chunk) in pages.iter().enumerate() {
        let mut lines = vec![
            "Bike Service Report - Completed Services".to_string(),
            format!("Customer: {owner_email}"),
            format!(
                "Generated: {}    Page {} of {page_count}",
                generated_on.format(DATE_FORMAT),
                page_index + 1
            ),
            String::new(),
        ];
        for (offset, booking) in chunk.iter().enumerate() {
            lines.extend(booking_lines(page_index * BOOKINGS_PER_PAGE + offset + 1, booking));
            lines.push(String::new());
        }

        let stream = text_stream(&lines);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            page_ids[page_index] + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

fn text_stream(lines: &[String]) -> String {
    let top = PAGE_HEIGHT - 60;
    let mut stream = format!("BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n50 {top} Td\n");
    for line in lines {
        stream.push_str(&format!("({}) Tj T*\n", escape_pdf_text(line)));
    }
    stream.push_str("ET");
    stream
}

/// Escapes PDF string delimiters. The built-in Helvetica encoding only covers
/// ASCII reliably, so anything else is replaced.
fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}
