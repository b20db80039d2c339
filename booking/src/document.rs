//! Ticket document generation.
//!
//! A confirmed ticket is rendered once into a fixed-layout PDF with a QR
//! code carrying the ticket id, written to the download directory,
//! optionally spooled to the receipt printer, and emailed to the customer.
//! The cash register prints on narrow thermal paper and uses its own layout.

use chrono::NaiveDate;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Pt, Rect, Rgb};
use qrcode::QrCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use ticketdesk_api::{Money, SharedBookingApi, TicketRecord};

use crate::delivery::{self, DeliveryReport};
use crate::pricing::ADMIN_FEE;

/// Venue name printed on every ticket
pub const VENUE: &str = "Mega Jump";

/// Document errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The PDF could not be produced
    #[error("Failed to render ticket: {0}")]
    Render(String),

    /// The ticket id does not fit in a QR code
    #[error("Failed to encode QR code: {0}")]
    QrCode(String),

    /// Writing the download or spool file failed
    #[error("Failed to write {path}: {message}")]
    Io {
        /// Target file
        path: PathBuf,
        /// OS error
        message: String,
    },

    /// This ticket was already generated
    #[error("Ticket {ticket_id} was already generated")]
    AlreadyGenerated {
        /// Ticket id
        ticket_id: String,
    },
}

/// Which flow produced the ticket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TicketSource {
    /// Storefront purchase
    #[default]
    Regular,
    /// Walk-in desk
    WalkIn,
    /// Cash register
    AdminCashPayment,
}

impl TicketSource {
    /// Layout used for this source
    #[must_use]
    pub const fn layout(self) -> LayoutPreset {
        match self {
            Self::AdminCashPayment => LayoutPreset::THERMAL,
            Self::Regular | Self::WalkIn => LayoutPreset::STANDARD,
        }
    }

    /// Thermal receipt layout
    #[must_use]
    pub const fn is_thermal(self) -> bool {
        matches!(self, Self::AdminCashPayment)
    }
}

/// Page geometry and typography, in points from the top-left corner
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutPreset {
    /// Page width
    pub page_width: f32,
    /// Page height
    pub page_height: f32,
    /// Left edge of the text block
    pub x: f32,
    /// Baseline of the first text line
    pub y: f32,
    /// Distance between baselines
    pub line_height: f32,
    /// Font size
    pub font_size: f32,
    /// QR code offset from `(x, y)`
    pub qr_offset: (f32, f32),
    /// QR code edge length
    pub qr_size: f32,
}

impl LayoutPreset {
    /// A4 page for web and walk-in tickets
    pub const STANDARD: Self = Self {
        page_width: 595.0,
        page_height: 842.0,
        x: 320.0,
        y: 70.0,
        line_height: 11.0,
        font_size: 12.0,
        qr_offset: (125.0, 115.0),
        qr_size: 80.0,
    };

    /// Thermal receipt for the cash register
    pub const THERMAL: Self = Self {
        page_width: 230.0,
        page_height: 590.0,
        x: 32.0,
        y: 120.0,
        line_height: 12.0,
        font_size: 10.0,
        qr_offset: (110.0, 135.0),
        qr_size: 50.0,
    };

    /// Top-left corner of the QR code
    #[must_use]
    pub fn qr_origin(&self) -> (f32, f32) {
        (self.x + self.qr_offset.0, self.y + self.qr_offset.1)
    }
}

fn display_date(date: &str) -> String {
    date.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map_or_else(|| date.to_string(), |day| day.format("%d/%m/%Y").to_string())
}

/// Text lines of the ticket, top to bottom
#[must_use]
pub fn ticket_lines(ticket: &TicketRecord, source: TicketSource) -> Vec<String> {
    let mut lines = vec![
        format!("Name: {}", ticket.name),
        format!("Ticket ID: {}", ticket.ticket_id),
        format!(
            "Date: {}  Time: {} - {}",
            display_date(&ticket.date),
            ticket.start_time,
            ticket.end_time
        ),
        format!("Venue: {VENUE}"),
        format!("Number of Tickets: {}", ticket.tickets),
        format!("Ticket Price: {}", ticket.amount),
    ];

    if source.is_thermal() {
        lines.push(format!("Half Time Tickets: {}", ticket.half_time_tickets));
    }

    if let Some(bundle) = &ticket.selected_bundle {
        lines.push(format!(
            "1 x Bundle: {} - Discount: {}%",
            bundle.name, bundle.discount_percent
        ));
        if !bundle.description.is_empty() {
            lines.push(bundle.description.clone());
        }
    }

    if ticket.cancellation_enabled {
        lines.push("Cancellation Enabled: true".to_string());
    }

    if source.is_thermal() {
        lines.push(format!("Socks Total: {}", ticket.total_add_on_amount));
    } else {
        lines.push(format!("Socks Total: {}", socks_total(ticket)));
        lines.push(format!("Administration Fee: {ADMIN_FEE}"));
    }

    lines.push(format!("Total Cost: {}", ticket.subtotal));
    lines
}

struct Canvas {
    layer: PdfLayerReference,
    page_height: f32,
}

impl Canvas {
    fn pt(value: f32) -> Mm {
        Mm::from(Pt(value))
    }

    fn fill(&self, rgb: (f32, f32, f32)) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None)));
    }

    /// Filled rectangle given by its top-left corner
    fn rect(&self, x: f32, y: f32, width: f32, height: f32) {
        let bottom = self.page_height - y - height;
        self.layer.add_rect(Rect::new(
            Self::pt(x),
            Self::pt(bottom),
            Self::pt(x + width),
            Self::pt(bottom + height),
        ));
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
        self.layer.use_text(
            text,
            size,
            Self::pt(x),
            Self::pt(self.page_height - y),
            font,
        );
    }
}

const BRAND: (f32, f32, f32) = (0.90, 0.22, 0.27);
const PAPER: (f32, f32, f32) = (1.0, 1.0, 1.0);
const INK: (f32, f32, f32) = (0.0, 0.0, 0.0);

fn draw_background(canvas: &Canvas, layout: &LayoutPreset, source: TicketSource, font: &IndirectFontRef) {
    let (w, h) = (layout.page_width, layout.page_height);
    if source.is_thermal() {
        canvas.fill(INK);
        canvas.rect(8.0, 8.0, w - 16.0, h - 16.0);
        canvas.fill(PAPER);
        canvas.rect(10.0, 10.0, w - 20.0, h - 20.0);
        canvas.fill(INK);
        canvas.text(VENUE, 16.0, layout.x, 70.0, font);
    } else {
        canvas.fill(BRAND);
        canvas.rect(0.0, 0.0, w, 40.0);
        canvas.rect(20.0, 50.0, w - 40.0, 240.0);
        canvas.fill(PAPER);
        canvas.rect(23.0, 53.0, w - 46.0, 234.0);
        canvas.text(VENUE, 20.0, 30.0, 28.0, font);
        canvas.fill(INK);
    }
}

fn draw_qr(canvas: &Canvas, layout: &LayoutPreset, ticket_id: &str) -> Result<(), DocumentError> {
    let code = QrCode::new(ticket_id.as_bytes()).map_err(|e| DocumentError::QrCode(e.to_string()))?;
    let width = u16::try_from(code.width()).map_err(|e| DocumentError::QrCode(e.to_string()))?;
    let modules = f32::from(width);
    let module = layout.qr_size / modules;
    let (origin_x, origin_y) = layout.qr_origin();

    canvas.fill(PAPER);
    canvas.rect(origin_x, origin_y, layout.qr_size, layout.qr_size);
    canvas.fill(INK);

    let mut row = 0u16;
    let mut col = 0u16;
    for color in code.to_colors() {
        if color == qrcode::Color::Dark {
            canvas.rect(
                origin_x + f32::from(col) * module,
                origin_y + f32::from(row) * module,
                module,
                module,
            );
        }
        col += 1;
        if col == width {
            col = 0;
            row += 1;
        }
    }
    Ok(())
}

/// Render `ticket` to PDF bytes
///
/// # Errors
///
/// Returns [`DocumentError::QrCode`] when the ticket id cannot be encoded
/// and [`DocumentError::Render`] when the PDF writer fails.
pub fn render_ticket(ticket: &TicketRecord, source: TicketSource) -> Result<Vec<u8>, DocumentError> {
    let layout = source.layout();
    let (doc, page, layer) = PdfDocument::new(
        format!("Ticket {}", ticket.ticket_id),
        Canvas::pt(layout.page_width),
        Canvas::pt(layout.page_height),
        "Ticket",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| DocumentError::Render(e.to_string()))?;
    let canvas = Canvas {
        layer: doc.get_page(page).get_layer(layer),
        page_height: layout.page_height,
    };

    draw_background(&canvas, &layout, source, &font);

    let mut baseline = layout.y;
    for line in ticket_lines(ticket, source) {
        canvas.text(&line, layout.font_size, layout.x, baseline, &font);
        baseline += layout.line_height;
    }

    draw_qr(&canvas, &layout, &ticket.ticket_id)?;

    doc.save_to_bytes()
        .map_err(|e| DocumentError::Render(e.to_string()))
}

/// Where generated tickets go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Directory of the downloaded file
    pub download_dir: PathBuf,
    /// Name of the downloaded file
    pub file_name: String,
    /// Command receiving the spool file path as its only argument
    pub print_command: String,
    /// Delay before the spool file is removed
    pub print_cleanup: Duration,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            file_name: "MegaJump_Ticket.pdf".to_string(),
            print_command: "lp".to_string(),
            print_cleanup: Duration::from_secs(70),
        }
    }
}

/// Generation progress of one ticket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationState {
    /// Not generated yet
    #[default]
    Idle,
    /// Rendering or delivering
    Generating,
    /// Finished, successfully or not
    Done,
}

/// What happened to a generated ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    /// Ticket id
    pub ticket_id: String,
    /// Downloaded file
    pub file: PathBuf,
    /// Sent to the printer
    pub printed: bool,
    /// Email outcome
    pub delivery: DeliveryReport,
}

/// Renders and delivers each confirmed ticket exactly once
pub struct TicketDispatcher {
    api: SharedBookingApi,
    options: DocumentOptions,
    latches: Mutex<HashMap<String, GenerationState>>,
}

impl std::fmt::Debug for TicketDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketDispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TicketDispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(api: SharedBookingApi, options: DocumentOptions) -> Self {
        Self {
            api,
            options,
            latches: Mutex::new(HashMap::new()),
        }
    }

    /// Output options
    #[must_use]
    pub const fn options(&self) -> &DocumentOptions {
        &self.options
    }

    /// Generation state of `ticket_id`
    #[must_use]
    pub fn state(&self, ticket_id: &str) -> GenerationState {
        self.latches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ticket_id)
            .copied()
            .unwrap_or_default()
    }

    fn begin(&self, ticket_id: &str) -> Result<(), DocumentError> {
        let mut latches = self.latches.lock().unwrap_or_else(PoisonError::into_inner);
        let state = latches.entry(ticket_id.to_string()).or_default();
        if *state != GenerationState::Idle {
            return Err(DocumentError::AlreadyGenerated {
                ticket_id: ticket_id.to_string(),
            });
        }
        *state = GenerationState::Generating;
        Ok(())
    }

    fn finish(&self, ticket_id: &str) {
        self.latches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket_id.to_string(), GenerationState::Done);
    }

    /// Render, download, optionally print, and email `ticket`
    ///
    /// Printing is only offered for [`TicketSource::AdminCashPayment`] and a
    /// failed print does not fail the dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::AlreadyGenerated`] on re-entry for the same
    /// ticket id, otherwise render or file errors.
    pub async fn dispatch(
        &self,
        ticket: &TicketRecord,
        source: TicketSource,
        print: bool,
    ) -> Result<DispatchReport, DocumentError> {
        let ticket_id = ticket.ticket_id.clone();
        self.begin(&ticket_id)?;
        let result = self.generate(ticket, source, print).await;
        self.finish(&ticket_id);
        result
    }

    async fn generate(
        &self,
        ticket: &TicketRecord,
        source: TicketSource,
        print: bool,
    ) -> Result<DispatchReport, DocumentError> {
        let pdf = render_ticket(ticket, source)?;
        tracing::info!(ticket_id = %ticket.ticket_id, ?source, bytes = pdf.len(), "Ticket rendered");

        let file = self.options.download_dir.join(&self.options.file_name);
        write_file(&file, &pdf).await?;

        let printed = if print && source.is_thermal() {
            self.print(&ticket.ticket_id, &pdf).await
        } else {
            false
        };

        let delivery =
            delivery::deliver(self.api.as_ref(), &ticket.email, &ticket.ticket_id, &pdf).await;

        Ok(DispatchReport {
            ticket_id: ticket.ticket_id.clone(),
            file,
            printed,
            delivery,
        })
    }

    async fn print(&self, ticket_id: &str, pdf: &[u8]) -> bool {
        let spool = std::env::temp_dir().join(format!("ticketdesk-{ticket_id}.pdf"));
        if let Err(error) = write_file(&spool, pdf).await {
            tracing::warn!(%error, "Print spool file not written");
            return false;
        }

        let status = tokio::process::Command::new(&self.options.print_command)
            .arg(&spool)
            .status()
            .await;

        let cleanup = self.options.print_cleanup;
        let spooled = spool.clone();
        tokio::spawn(async move {
            tokio::time::sleep(cleanup).await;
            if let Err(error) = tokio::fs::remove_file(&spooled).await {
                tracing::debug!(%error, path = %spooled.display(), "Spool file already gone");
            }
        });

        match status {
            Ok(status) if status.success() => {
                tracing::info!(%ticket_id, "Ticket sent to printer");
                true
            },
            Ok(status) => {
                tracing::warn!(%ticket_id, %status, "Print command failed");
                false
            },
            Err(error) => {
                tracing::warn!(%ticket_id, %error, command = %self.options.print_command, "Print command not started");
                false
            },
        }
    }
}

/// Write `bytes` to `path`
///
/// # Errors
///
/// Returns [`DocumentError::Io`] when the file cannot be written.
pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Sum shown as "Socks Total" on standard tickets
#[must_use]
pub fn socks_total(ticket: &TicketRecord) -> Money {
    if ticket.cancellation_fee.is_zero() {
        ticket.total_add_on_amount
    } else {
        ticket
            .total_add_on_amount
            .saturating_sub(ticket.cancellation_fee)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use ticketdesk_api::Bundle;

    fn ticket() -> TicketRecord {
        TicketRecord {
            ticket_id: "TKT-1042".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            date: "2025-07-12".to_string(),
            start_time: "10:00".to_string(),
            end_time: "11:00".to_string(),
            tickets: 2,
            amount: Money::from_euros(30),
            total_add_on_amount: Money::from_euros(11),
            cancellation_fee: Money::from_euros(6),
            cancellation_enabled: true,
            subtotal: Money::from_cents(4350),
            ..TicketRecord::default()
        }
    }

    #[test]
    fn standard_lines() {
        let lines = ticket_lines(&ticket(), TicketSource::Regular);
        assert_eq!(lines[0], "Name: Ada");
        assert_eq!(lines[2], "Date: 12/07/2025  Time: 10:00 - 11:00");
        assert_eq!(lines[3], "Venue: Mega Jump");
        assert!(lines.contains(&"Cancellation Enabled: true".to_string()));
        assert!(lines.contains(&"Socks Total: €5.00".to_string()));
        assert!(lines.contains(&"Administration Fee: €2.50".to_string()));
        assert_eq!(lines.last().unwrap(), "Total Cost: €43.50");
        assert!(!lines.iter().any(|l| l.starts_with("Half Time")));
    }

    #[test]
    fn thermal_lines_skip_fee() {
        let mut ticket = ticket();
        ticket.half_time_tickets = 3;
        ticket.selected_bundle = Some(Bundle {
            name: "Family".to_string(),
            description: "4 jumpers".to_string(),
            discount_percent: 20.0,
            ..Bundle::default()
        });
        let lines = ticket_lines(&ticket, TicketSource::AdminCashPayment);
        assert!(lines.contains(&"Half Time Tickets: 3".to_string()));
        assert!(lines.contains(&"1 x Bundle: Family - Discount: 20%".to_string()));
        assert!(lines.contains(&"4 jumpers".to_string()));
        assert!(lines.contains(&"Socks Total: €11.00".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Administration")));
    }

    #[test]
    fn layout_follows_source() {
        assert_eq!(TicketSource::AdminCashPayment.layout(), LayoutPreset::THERMAL);
        assert_eq!(TicketSource::WalkIn.layout(), LayoutPreset::STANDARD);
        assert_eq!(LayoutPreset::STANDARD.qr_origin(), (445.0, 185.0));
    }

    #[test]
    fn renders_pdf() {
        let pdf = render_ticket(&ticket(), TicketSource::Regular).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn socks_total_strips_insurance() {
        assert_eq!(socks_total(&ticket()), Money::from_euros(5));
    }
}
