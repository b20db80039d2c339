//! Admin console for the `adminJump` role.
//!
//! Wraps [`VenueClient`] with the form checks and derived views the
//! dashboard needs: settings, time slots (single and bulk), bundles,
//! vouchers, tickets with search and paging, cancellation requests,
//! refunds, authenticated mass deletes and the sales summary.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use ticketdesk_api::types::{
    BulkSlotRequest, CancelRequest, DayType, DeletedCount, MassRefundReport, SlotRef, SlotTemplate,
    TicketAnalytics, TimeSlotInput, UnusedTicketsReport, VoucherDefinition, format_date,
};
use ticketdesk_api::{
    AdminCredentials, ApiError, Bundle, Money, PaymentMethod, Settings, TicketRecord, TimeSlot, VenueClient,
};

/// Tickets per page in the ticket table
pub const TICKETS_PER_PAGE: usize = 10;

/// Requests per page in the cancellation table
pub const CANCELS_PER_PAGE: usize = 10;

/// Capacity pre-filled in new slot rows
pub const DEFAULT_SLOT_CAPACITY: u32 = 30;

/// Admin console failures
#[derive(Debug, Error)]
pub enum AdminError {
    /// Single slot form incomplete
    #[error("Please fill all individual fields.")]
    IncompleteSlot,

    /// Bulk template has no row with both times
    #[error("Please fill at least one valid slot.")]
    NoValidSlots,

    /// Bulk creation needs the event range from settings
    #[error("Missing event start or end date in settings.")]
    MissingEventDates,

    /// Date-scoped action without a date
    #[error("Please select a date first.")]
    DateRequired,

    /// Mass refund target not found on that date
    #[error("Please select a valid date and time slot.")]
    SlotNotFound,

    /// Ticket without `_id` or `ticketId`
    #[error("Invalid ticket identifier")]
    InvalidTicketId,

    /// Record without a server id
    #[error("{0} has no id")]
    MissingId(&'static str),

    /// Required form field empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Delete-all without email or password
    #[error("Please enter both email and password.")]
    MissingAuth,

    /// Bulk unused delete without username or password
    #[error("Please enter admin credentials")]
    MissingAdminCredentials,

    /// 401 on an authenticated delete
    #[error("Invalid admin credentials")]
    InvalidCredentials,

    /// Any other API failure
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AdminError {
    /// Message to show in the console
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.user_message("Something went wrong. Please try again."),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Slot forms
// ============================================================================

/// Create or edit one slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotForm {
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// Start time (`HH:MM`)
    pub start_time: String,
    /// End time (`HH:MM`)
    pub end_time: String,
    /// Capacity
    pub max_tickets: u32,
}

impl Default for SlotForm {
    fn default() -> Self {
        Self {
            date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            max_tickets: DEFAULT_SLOT_CAPACITY,
        }
    }
}

impl SlotForm {
    /// Pre-filled from an existing slot
    #[must_use]
    pub fn from_slot(slot: &TimeSlot) -> Self {
        Self {
            date: slot.date.clone(),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            max_tickets: slot.max_tickets,
        }
    }

    /// Request body
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::IncompleteSlot`] when date or a time is empty.
    pub fn to_input(&self) -> Result<TimeSlotInput, AdminError> {
        if [&self.date, &self.start_time, &self.end_time]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(AdminError::IncompleteSlot);
        }
        Ok(TimeSlotInput {
            date: self.date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            max_tickets: self.max_tickets,
        })
    }
}

/// Template applied to every weekday or weekend day of the event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkSlotForm {
    /// Which days the rows apply to
    pub day_type: DayType,
    /// Rows; blank ones are skipped
    pub rows: Vec<SlotTemplate>,
}

impl BulkSlotForm {
    /// Four blank weekday rows
    #[must_use]
    pub fn weekday() -> Self {
        Self::blank(DayType::Weekday, 4)
    }

    /// Seven blank weekend rows
    #[must_use]
    pub fn weekend() -> Self {
        Self::blank(DayType::Weekend, 7)
    }

    fn blank(day_type: DayType, rows: usize) -> Self {
        Self {
            day_type,
            rows: vec![
                SlotTemplate {
                    start_time: String::new(),
                    end_time: String::new(),
                    max_tickets: DEFAULT_SLOT_CAPACITY,
                };
                rows
            ],
        }
    }

    /// Fill row `index`; out-of-range indexes are ignored
    pub fn set_row(&mut self, index: usize, start_time: &str, end_time: &str, max_tickets: u32) {
        if let Some(row) = self.rows.get_mut(index) {
            row.start_time = start_time.to_string();
            row.end_time = end_time.to_string();
            row.max_tickets = max_tickets;
        }
    }

    /// Request body over the event range in `settings`
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NoValidSlots`] when no row has both times and
    /// [`AdminError::MissingEventDates`] when the settings lack the range.
    pub fn request(&self, settings: Option<&Settings>) -> Result<BulkSlotRequest, AdminError> {
        let slots: Vec<SlotTemplate> = self
            .rows
            .iter()
            .filter(|row| !row.start_time.trim().is_empty() && !row.end_time.trim().is_empty())
            .cloned()
            .collect();
        if slots.is_empty() {
            return Err(AdminError::NoValidSlots);
        }

        let range = settings.and_then(|s| {
            let start = s.start_date.as_deref().filter(|d| !d.is_empty())?;
            let end = s.end_date.as_deref().filter(|d| !d.is_empty())?;
            Some((start.to_string(), end.to_string()))
        });
        let Some((event_start_date, event_end_date)) = range else {
            return Err(AdminError::MissingEventDates);
        };

        Ok(BulkSlotRequest {
            event_start_date,
            event_end_date,
            day_type: self.day_type,
            slots,
        })
    }
}

// ============================================================================
// Dashboard snapshot
// ============================================================================

/// One page of a table
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: usize,
    /// Number of pages (at least 1)
    pub total_pages: usize,
    /// Rows across all pages
    pub total_items: usize,
}

/// Slice `items` into 1-based page `page`
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    Page {
        items: items
            .iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect(),
        page,
        total_pages: items.len().div_ceil(per_page).max(1),
        total_items: items.len(),
    }
}

/// Everything the dashboard shows at once
#[derive(Clone, Debug, Default)]
pub struct Dashboard {
    /// Venue settings
    pub settings: Option<Settings>,
    /// All slots
    pub slots: Vec<TimeSlot>,
    /// All tickets
    pub tickets: Vec<TicketRecord>,
    /// Cancellation requests
    pub cancel_requests: Vec<CancelRequest>,
    /// Bundles
    pub bundles: Vec<Bundle>,
    /// Server-side analytics
    pub analytics: TicketAnalytics,
}

impl Dashboard {
    /// Reload from `console`; on failure every section is cleared
    ///
    /// # Errors
    ///
    /// Returns the first failed fetch.
    pub async fn refresh(&mut self, console: &AdminConsole) -> Result<(), AdminError> {
        match console.dashboard().await {
            Ok(dashboard) => {
                *self = dashboard;
                Ok(())
            },
            Err(error) => {
                *self = Self::default();
                Err(error)
            },
        }
    }

    /// Tickets matching `query` on ticket id, name, surname or email
    #[must_use]
    pub fn search_tickets(&self, query: &str) -> Vec<TicketRecord> {
        let query = query.trim().to_lowercase();
        self.tickets
            .iter()
            .filter(|ticket| {
                query.is_empty()
                    || [&ticket.ticket_id, &ticket.name, &ticket.surname, &ticket.email]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    /// Search result page
    #[must_use]
    pub fn ticket_page(&self, query: &str, page: usize) -> Page<TicketRecord> {
        paginate(&self.search_tickets(query), page, TICKETS_PER_PAGE)
    }

    /// Cancellation request page
    #[must_use]
    pub fn cancel_page(&self, page: usize) -> Page<CancelRequest> {
        paginate(&self.cancel_requests, page, CANCELS_PER_PAGE)
    }

    /// Slots on `date`
    #[must_use]
    pub fn slots_on(&self, date: NaiveDate) -> Vec<&TimeSlot> {
        self.slots.iter().filter(|slot| slot.is_on(date)).collect()
    }

    /// Tickets that redeemed a voucher
    #[must_use]
    pub fn vouchered_tickets(&self) -> Vec<&TicketRecord> {
        self.tickets.iter().filter(|t| t.voucher_data.is_some()).collect()
    }

    /// Sales over all tickets
    #[must_use]
    pub fn sales_summary(&self) -> SalesSummary {
        SalesSummary::from_tickets(&self.tickets)
    }
}

// ============================================================================
// Sales summary
// ============================================================================

/// Client-side sales figures over confirmed tickets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SalesSummary {
    /// Confirmed bookings
    pub total_sales: u64,
    /// Admitted people (regular, bundle and half-time)
    pub total_tickets: u64,
    /// Regular tickets
    pub regular_tickets: u64,
    /// Tickets included in bundles
    pub bundle_tickets: u64,
    /// Half-time tickets
    pub half_time_tickets: u64,
    /// Bookings with a bundle
    pub bundle_sales: u64,
    /// Pairs of socks
    pub total_socks: u64,
    /// Sum of subtotals
    pub total_revenue: Money,
    /// Cash bookings
    pub cash_payments: u64,
    /// Card bookings
    pub card_payments: u64,
    /// Cash takings
    pub cash_revenue: Money,
    /// Card takings
    pub card_revenue: Money,
}

impl SalesSummary {
    /// Summarize, skipping `pending` payments
    #[must_use]
    pub fn from_tickets<'a>(tickets: impl IntoIterator<Item = &'a TicketRecord>) -> Self {
        let mut summary = Self::default();
        for ticket in tickets.into_iter().filter(|t| t.is_confirmed()) {
            summary.total_sales += 1;
            summary.total_tickets += u64::from(ticket.admitted_count());
            summary.regular_tickets += u64::from(ticket.tickets);
            summary.half_time_tickets += u64::from(ticket.half_time_tickets);
            summary.total_socks += u64::from(ticket.socks_count);
            if let Some(bundle) = &ticket.selected_bundle {
                summary.bundle_sales += 1;
                summary.bundle_tickets += u64::from(bundle.tickets);
            }
            summary.total_revenue = summary.total_revenue + ticket.subtotal;
            if ticket.is_cash_payment || ticket.payment_method == Some(PaymentMethod::Cash) {
                summary.cash_payments += 1;
                summary.cash_revenue = summary.cash_revenue + ticket.subtotal;
            } else {
                summary.card_payments += 1;
                summary.card_revenue = summary.card_revenue + ticket.subtotal;
            }
        }
        summary
    }

    /// Summarize the tickets booked for `date`
    #[must_use]
    pub fn on(tickets: &[TicketRecord], date: NaiveDate) -> Self {
        let day = format_date(date);
        Self::from_tickets(tickets.iter().filter(|t| t.date == day))
    }
}

// ============================================================================
// Console
// ============================================================================

/// Admin operations over the venue API
#[derive(Clone, Debug)]
pub struct AdminConsole {
    client: VenueClient,
}

impl AdminConsole {
    /// Create a console
    #[must_use]
    pub const fn new(client: VenueClient) -> Self {
        Self { client }
    }

    /// Underlying client
    #[must_use]
    pub const fn client(&self) -> &VenueClient {
        &self.client
    }

    /// Fetch every dashboard section concurrently
    ///
    /// # Errors
    ///
    /// Returns the first failed fetch; nothing partial is returned.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard, AdminError> {
        let result = futures::try_join!(
            self.client.fetch_settings(),
            self.client.fetch_all_slots(),
            self.client.fetch_tickets(),
            self.client.fetch_cancel_requests(),
            self.client.fetch_bundles(),
            self.client.ticket_analytics(),
        );
        match result {
            Ok((settings, slots, tickets, cancel_requests, bundles, analytics)) => {
                tracing::info!(
                    slots = slots.len(),
                    tickets = tickets.len(),
                    cancel_requests = cancel_requests.len(),
                    "Dashboard loaded"
                );
                Ok(Dashboard {
                    settings,
                    slots,
                    tickets,
                    cancel_requests,
                    bundles,
                    analytics,
                })
            },
            Err(error) => {
                tracing::error!(%error, "Dashboard load failed");
                Err(error.into())
            },
        }
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Update the existing record, or create one when it has no id
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn save_settings(&self, settings: &Settings) -> Result<Value, AdminError> {
        let response = match settings.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => self.client.update_settings(id, settings).await?,
            None => self.client.create_settings(settings).await?,
        };
        tracing::info!(location = %settings.location_name, "Settings saved");
        Ok(response)
    }

    // ------------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------------

    /// Create one slot
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::IncompleteSlot`] or the API failure.
    pub async fn create_slot(&self, form: &SlotForm) -> Result<Value, AdminError> {
        let input = form.to_input()?;
        Ok(self.client.create_slot(&input).await?)
    }

    /// Replace slot `id`
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::IncompleteSlot`] or the API failure.
    pub async fn update_slot(&self, id: &str, form: &SlotForm) -> Result<Value, AdminError> {
        let input = form.to_input()?;
        Ok(self.client.update_slot(id, &input).await?)
    }

    /// Delete slot `id`
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn delete_slot(&self, id: &str) -> Result<Value, AdminError> {
        Ok(self.client.delete_slot(id).await?)
    }

    /// Create slots from a weekday or weekend template
    ///
    /// # Errors
    ///
    /// Returns the template error without a request, or the API failure.
    pub async fn bulk_create_slots(
        &self,
        form: &BulkSlotForm,
        settings: Option<&Settings>,
    ) -> Result<Value, AdminError> {
        let request = form.request(settings)?;
        tracing::info!(
            day_type = ?request.day_type,
            rows = request.slots.len(),
            from = %request.event_start_date,
            to = %request.event_end_date,
            "Bulk creating slots"
        );
        Ok(self.client.bulk_create_slots(&request).await?)
    }

    /// Delete every slot on `date`
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::DateRequired`] or the API failure.
    pub async fn delete_slots_on(&self, date: Option<NaiveDate>) -> Result<DeletedCount, AdminError> {
        let date = date.ok_or(AdminError::DateRequired)?;
        let deleted = self.client.delete_slots_on(&format_date(date)).await?;
        tracing::warn!(%date, deleted = deleted.deleted_count, "Slots deleted for date");
        Ok(deleted)
    }

    /// Delete every slot
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn delete_all_slots(&self) -> Result<DeletedCount, AdminError> {
        let deleted = self.client.delete_all_slots().await?;
        tracing::warn!(deleted = deleted.deleted_count, "All slots deleted");
        Ok(deleted)
    }

    // ------------------------------------------------------------------------
    // Bundles
    // ------------------------------------------------------------------------

    /// Update the bundle, or create it when it has no id
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingField`] for an unnamed bundle or the API failure.
    pub async fn save_bundle(&self, bundle: &Bundle) -> Result<Value, AdminError> {
        if bundle.name.trim().is_empty() {
            return Err(AdminError::MissingField("Bundle name"));
        }
        Ok(match bundle.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => self.client.update_bundle(id, bundle).await?,
            None => self.client.create_bundle(bundle).await?,
        })
    }

    /// Delete a bundle
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingId`] or the API failure.
    pub async fn delete_bundle(&self, bundle: &Bundle) -> Result<Value, AdminError> {
        let id = bundle.id.as_deref().ok_or(AdminError::MissingId("Bundle"))?;
        Ok(self.client.delete_bundle(id).await?)
    }

    // ------------------------------------------------------------------------
    // Vouchers
    // ------------------------------------------------------------------------

    /// List vouchers, optionally only active or inactive ones
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn vouchers(&self, active: Option<bool>) -> Result<Vec<VoucherDefinition>, AdminError> {
        Ok(self.client.fetch_vouchers(active).await?)
    }

    /// Update the voucher, or create it when it has no id
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingField`] for a missing code or name, or the API failure.
    pub async fn save_voucher(&self, voucher: &VoucherDefinition) -> Result<Value, AdminError> {
        if voucher.code.trim().is_empty() {
            return Err(AdminError::MissingField("Voucher code"));
        }
        if voucher.name.trim().is_empty() {
            return Err(AdminError::MissingField("Voucher name"));
        }
        let mut voucher = voucher.clone();
        voucher.code = voucher.code.trim().to_uppercase();
        Ok(match voucher.id.clone().filter(|id| !id.is_empty()) {
            Some(id) => self.client.update_voucher(&id, &voucher).await?,
            None => self.client.create_voucher(&voucher).await?,
        })
    }

    /// Delete a voucher
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingId`] or the API failure.
    pub async fn delete_voucher(&self, voucher: &VoucherDefinition) -> Result<Value, AdminError> {
        let id = voucher.id.as_deref().ok_or(AdminError::MissingId("Voucher"))?;
        Ok(self.client.delete_voucher(id).await?)
    }

    // ------------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------------

    /// Delete one ticket
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::InvalidTicketId`] or the API failure.
    pub async fn delete_ticket(&self, ticket: &TicketRecord) -> Result<Value, AdminError> {
        let id = ticket.record_id();
        if id.is_empty() {
            return Err(AdminError::InvalidTicketId);
        }
        let response = self.client.delete_ticket(id).await?;
        tracing::info!(ticket_id = %id, "Ticket deleted");
        Ok(response)
    }

    /// Delete every ticket after re-authenticating
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingAuth`], [`AdminError::InvalidCredentials`]
    /// on 401, or the API failure.
    pub async fn delete_all_tickets(&self, email: &str, password: &str) -> Result<DeletedCount, AdminError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AdminError::MissingAuth);
        }
        let deleted = self
            .client
            .delete_all_tickets(email.trim(), password)
            .await
            .map_err(credentials_error)?;
        tracing::warn!(deleted = deleted.deleted_count, "All tickets deleted");
        Ok(deleted)
    }

    /// Today's unused tickets
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn unused_tickets_today(&self) -> Result<UnusedTicketsReport, AdminError> {
        Ok(self.client.unused_tickets_today().await?)
    }

    /// Delete today's unused tickets after re-authenticating
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::MissingAdminCredentials`],
    /// [`AdminError::InvalidCredentials`] on 401, or the API failure.
    pub async fn delete_unused_today(&self, credentials: &AdminCredentials) -> Result<DeletedCount, AdminError> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AdminError::MissingAdminCredentials);
        }
        let deleted = self
            .client
            .bulk_delete_unused_today(credentials)
            .await
            .map_err(credentials_error)?;
        tracing::warn!(deleted = deleted.deleted_count, "Unused tickets deleted");
        Ok(deleted)
    }

    // ------------------------------------------------------------------------
    // Cancellations and refunds
    // ------------------------------------------------------------------------

    /// Refund one ticket
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn refund(&self, ticket_id: &str) -> Result<String, AdminError> {
        let acknowledgement = self.client.refund_ticket(ticket_id).await?;
        tracing::info!(%ticket_id, "Refund processed");
        Ok(acknowledgement
            .message
            .unwrap_or_else(|| "Refund processed successfully".to_string()))
    }

    /// Refund every ticket in the slot on `date` starting at `start_time`
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::DateRequired`], [`AdminError::SlotNotFound`]
    /// when that date has no such slot, or the API failure.
    pub async fn mass_refund(
        &self,
        date: Option<NaiveDate>,
        start_time: &str,
    ) -> Result<MassRefundReport, AdminError> {
        let date = date.ok_or(AdminError::DateRequired)?;
        let day = format_date(date);
        let slots = self.client.fetch_slots(&day).await?;
        let slot = slots
            .iter()
            .find(|slot| slot.start_time == start_time)
            .ok_or(AdminError::SlotNotFound)?;

        let report = self
            .client
            .mass_refund(&SlotRef {
                date: day,
                start_time: slot.start_time.clone(),
                end_time: slot.end_time.clone(),
            })
            .await?;
        tracing::warn!(
            %date,
            start_time = %slot.start_time,
            refunded = report.refunded.len(),
            failed = report.failed.len(),
            "Mass refund processed"
        );
        Ok(report)
    }
}

fn credentials_error(error: ApiError) -> AdminError {
    match error {
        ApiError::Unauthorized { .. } => AdminError::InvalidCredentials,
        other => AdminError::Api(other),
    }
}
