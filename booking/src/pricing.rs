//! Client-side price arithmetic.
//!
//! Everything here is a pure function of the loaded settings and the
//! current choices. Totals are recomputed from scratch whenever an input
//! changes; nothing is cached between edits. Voucher discounts are never
//! derived locally: they come from the server and are only subtracted.

use ticketdesk_api::{AddOnData, AppliedVoucher, Bundle, Money, PaymentMethod, Settings};

/// Administration fee added to card payments
pub const ADMIN_FEE: Money = Money::from_cents(250);

/// Fee charged for `method`
#[must_use]
pub const fn admin_fee(method: PaymentMethod) -> Money {
    match method {
        PaymentMethod::Card => ADMIN_FEE,
        PaymentMethod::Cash => Money::ZERO,
    }
}

/// `fee_per_ticket × tickets` when enabled, zero otherwise
#[must_use]
pub const fn cancellation_fee(fee_per_ticket: Money, tickets: u32, enabled: bool) -> Money {
    if enabled {
        fee_per_ticket.times(tickets)
    } else {
        Money::ZERO
    }
}

/// Socks and cancellation insurance chosen for an order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOnSelection {
    /// Pairs of socks
    pub socks_count: u32,
    /// Cancellation insurance on
    pub cancellation_enabled: bool,
    /// Insurance total
    pub cancellation_fee: Money,
    /// Socks plus insurance
    pub total_add_on_amount: Money,
}

impl AddOnSelection {
    /// Price `socks` pairs and optional insurance for `tickets` tickets
    #[must_use]
    pub const fn compose(settings: &Settings, socks: u32, enabled: bool, tickets: u32) -> Self {
        Self::from_prices(
            settings.socks_price,
            settings.cancellation_fee,
            socks,
            enabled,
            tickets,
        )
    }

    /// Same as [`compose`](Self::compose) with explicit unit prices
    #[must_use]
    pub const fn from_prices(
        socks_price: Money,
        fee_per_ticket: Money,
        socks: u32,
        enabled: bool,
        tickets: u32,
    ) -> Self {
        let cancellation_fee = cancellation_fee(fee_per_ticket, tickets, enabled);
        Self {
            socks_count: socks,
            cancellation_enabled: enabled,
            cancellation_fee,
            total_add_on_amount: socks_price.times(socks).saturating_add(cancellation_fee),
        }
    }

    /// Socks only, no insurance
    #[must_use]
    pub const fn socks_only(settings: &Settings, socks: u32) -> Self {
        Self::compose(settings, socks, false, 0)
    }

    /// The `addonData` block of a checkout payload
    #[must_use]
    pub const fn to_data(&self) -> AddOnData {
        AddOnData {
            socks_count: self.socks_count,
            cancellation_enabled: self.cancellation_enabled,
            cancellation_fee: self.cancellation_fee,
            total_add_on_amount: self.total_add_on_amount,
        }
    }
}

/// Every line of an order total
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// Regular tickets × unit price
    pub ticket_amount: Money,
    /// Half-time tickets × half-time price (cash register only)
    pub half_time_amount: Money,
    /// Socks plus cancellation insurance
    pub add_on_amount: Money,
    /// Bundle price after its discount
    pub bundle_net: Money,
    /// Card administration fee
    pub admin_fee: Money,
    /// Sum of the lines above
    pub total_before_voucher: Money,
    /// Voucher discount, never more than `total_before_voucher`
    pub voucher_discount: Money,
    /// Amount charged
    pub total: Money,
}

impl PriceBreakdown {
    fn assemble(
        ticket_amount: Money,
        half_time_amount: Money,
        add_on_amount: Money,
        bundle: Option<&Bundle>,
        admin_fee: Money,
        voucher: Option<&AppliedVoucher>,
    ) -> Self {
        let bundle_net = bundle.map_or(Money::ZERO, Bundle::net_price);
        let total_before_voucher = ticket_amount
            + half_time_amount
            + add_on_amount
            + bundle_net
            + admin_fee;
        let voucher_discount = voucher
            .map_or(Money::ZERO, |v| v.discount_amount)
            .min(total_before_voucher);

        Self {
            ticket_amount,
            half_time_amount,
            add_on_amount,
            bundle_net,
            admin_fee,
            total_before_voucher,
            voucher_discount,
            total: total_before_voucher.saturating_sub(voucher_discount),
        }
    }

    /// Tickets plus bundle net (`amount` in the payload)
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.ticket_amount.saturating_add(self.bundle_net)
    }
}

/// Storefront order total
///
/// `tickets × ticketPrice + add-ons + bundle net + fee − voucher`, where the
/// fee is [`ADMIN_FEE`] for card payments and zero for cash.
#[must_use]
pub fn price_breakdown(
    settings: &Settings,
    tickets: u32,
    add_ons: &AddOnSelection,
    bundle: Option<&Bundle>,
    voucher: Option<&AppliedVoucher>,
    method: PaymentMethod,
) -> PriceBreakdown {
    PriceBreakdown::assemble(
        settings.ticket_price.times(tickets),
        Money::ZERO,
        add_ons.total_add_on_amount,
        bundle,
        admin_fee(method),
        voucher,
    )
}

/// Walk-in desk total: tickets, socks, bundle and the card fee, no insurance
#[must_use]
pub fn walk_in_breakdown(
    settings: &Settings,
    tickets: u32,
    socks: u32,
    bundle: Option<&Bundle>,
    voucher: Option<&AppliedVoucher>,
) -> PriceBreakdown {
    PriceBreakdown::assemble(
        settings.ticket_price.times(tickets),
        Money::ZERO,
        settings.socks_price.times(socks),
        bundle,
        ADMIN_FEE,
        voucher,
    )
}

/// Cash register total: no fee and no voucher
#[must_use]
pub fn cash_register_breakdown(
    settings: &Settings,
    tickets: u32,
    half_time_tickets: u32,
    half_time_price: Money,
    socks: u32,
    bundle: Option<&Bundle>,
) -> PriceBreakdown {
    PriceBreakdown::assemble(
        settings.ticket_price.times(tickets),
        half_time_price.times(half_time_tickets),
        settings.socks_price.times(socks),
        bundle,
        Money::ZERO,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            ticket_price: Money::from_euros(15),
            socks_price: Money::from_euros(5),
            cancellation_fee: Money::from_euros(3),
            ..Settings::default()
        }
    }

    fn family_bundle() -> Bundle {
        Bundle {
            name: "Family".to_string(),
            price: Money::from_euros(50),
            discount_percent: 20.0,
            tickets: 4,
            ..Bundle::default()
        }
    }

    #[test]
    fn two_tickets_with_socks_and_insurance() {
        let add_ons = AddOnSelection::compose(&settings(), 1, true, 2);
        assert_eq!(add_ons.cancellation_fee, Money::from_euros(6));
        assert_eq!(add_ons.total_add_on_amount, Money::from_euros(11));

        let breakdown = price_breakdown(&settings(), 2, &add_ons, None, None, PaymentMethod::Card);
        assert_eq!(breakdown.ticket_amount, Money::from_euros(30));
        assert_eq!(breakdown.total, Money::from_cents(4350));
    }

    #[test]
    fn voucher_discount_is_subtracted() {
        let add_ons = AddOnSelection::compose(&settings(), 1, true, 2);
        let voucher = AppliedVoucher {
            code: "SUMMER10".to_string(),
            discount_amount: Money::from_cents(435),
            original_amount: Money::from_cents(4350),
            final_amount: Money::from_cents(3915),
        };
        let breakdown =
            price_breakdown(&settings(), 2, &add_ons, None, Some(&voucher), PaymentMethod::Card);
        assert_eq!(breakdown.total, Money::from_cents(3915));
        assert_eq!(
            breakdown.total + breakdown.voucher_discount,
            breakdown.total_before_voucher
        );
    }

    #[test]
    fn bundle_alone_by_card() {
        let bundle = family_bundle();
        let breakdown = price_breakdown(
            &settings(),
            0,
            &AddOnSelection::default(),
            Some(&bundle),
            None,
            PaymentMethod::Card,
        );
        assert_eq!(breakdown.bundle_net, Money::from_euros(40));
        assert_eq!(breakdown.total, Money::from_cents(4250));
    }

    #[test]
    fn cash_register_has_no_fee() {
        let bundle = family_bundle();
        let breakdown =
            cash_register_breakdown(&settings(), 0, 0, Money::from_euros(9), 0, Some(&bundle));
        assert_eq!(breakdown.admin_fee, Money::ZERO);
        assert_eq!(breakdown.total, Money::from_euros(40));
    }

    #[test]
    fn half_time_tickets_use_their_own_price() {
        let breakdown = cash_register_breakdown(&settings(), 1, 2, Money::from_euros(9), 1, None);
        assert_eq!(breakdown.half_time_amount, Money::from_euros(18));
        assert_eq!(breakdown.total, Money::from_euros(38));
    }

    #[test]
    fn oversized_voucher_is_capped() {
        let voucher = AppliedVoucher {
            discount_amount: Money::from_euros(500),
            ..AppliedVoucher::default()
        };
        let breakdown = walk_in_breakdown(&settings(), 1, 0, None, Some(&voucher));
        assert_eq!(breakdown.total, Money::ZERO);
        assert_eq!(breakdown.voucher_discount, breakdown.total_before_voucher);
    }

    #[test]
    fn disabled_insurance_costs_nothing() {
        assert_eq!(cancellation_fee(Money::from_euros(3), 10, false), Money::ZERO);
        assert_eq!(cancellation_fee(Money::from_euros(3), 10, true), Money::from_euros(30));
    }
}
