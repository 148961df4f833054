//! Line fixtures shared by the unit tests in this crate.

use std::str::FromStr;

use rust_decimal::Decimal;

use gstr_core::money::split_tax;
use gstr_core::{
    CanonicalInvoiceLine, DocumentType, ExportDetail, ItemDetail, JurisdictionCode, LineFlags,
    Provenance, SupplyCategory, TaxSplit,
};

pub(crate) const FILER_JURISDICTION: &str = "27";
pub(crate) const BUYER: &str = "29ABCDE1234F1Z5";
pub(crate) const OPERATOR: &str = "07AARCM9332R1CQ";

pub(crate) fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) struct LineBuilder {
    line: CanonicalInvoiceLine,
}

/// A taxable intra-jurisdiction invoice line to an unregistered buyer.
pub(crate) fn line(document: &str, value: &str, rate: &str) -> LineBuilder {
    let origin = JurisdictionCode::new(FILER_JURISDICTION).unwrap();
    LineBuilder {
        line: CanonicalInvoiceLine {
            document_number_raw: document.to_string(),
            document_number_normalized: document.trim().to_uppercase(),
            document_type: DocumentType::TaxInvoice,
            document_date: None,
            counterparty_tax_id: None,
            counterparty_name: None,
            supply_jurisdiction_code: origin.clone(),
            origin_jurisdiction_code: origin,
            taxable_value: d(value),
            tax_rate_percent: d(rate),
            computed_tax: TaxSplit::zero(true),
            cess_amount: Decimal::ZERO,
            flags: LineFlags::default(),
            supply_category: SupplyCategory::Taxable,
            item: ItemDetail::default(),
            export: None,
            section: None,
            provenance: Provenance {
                origin_channel: "manual".into(),
                ..Provenance::default()
            },
        },
    }
}

impl LineBuilder {
    pub(crate) fn registered(mut self) -> Self {
        self.line.counterparty_tax_id = Some(BUYER.to_string());
        self
    }

    pub(crate) fn counterparty(mut self, tax_id: &str) -> Self {
        self.line.counterparty_tax_id = Some(tax_id.to_string());
        self
    }

    pub(crate) fn to(mut self, jurisdiction: &str) -> Self {
        self.line.supply_jurisdiction_code = JurisdictionCode::new(jurisdiction).unwrap();
        self
    }

    pub(crate) fn document_type(mut self, document_type: DocumentType) -> Self {
        self.line.document_type = document_type;
        self
    }

    pub(crate) fn category(mut self, category: SupplyCategory) -> Self {
        self.line.supply_category = category;
        self
    }

    pub(crate) fn advance(mut self) -> Self {
        self.line.flags.is_advance = true;
        self
    }

    pub(crate) fn advance_adjustment(mut self) -> Self {
        self.line.flags.is_advance_adjustment = true;
        self
    }

    pub(crate) fn export(mut self, with_payment: bool) -> Self {
        self.line.flags.is_export = true;
        self.line.flags.export_with_payment = with_payment;
        self.line.supply_jurisdiction_code = JurisdictionCode::new("96").unwrap();
        self.line.export = Some(ExportDetail {
            shipping_bill_number: Some("SB1".into()),
            shipping_bill_date: None,
            port_code: Some("INBOM4".into()),
        });
        self
    }

    pub(crate) fn hsn(mut self, code: &str, quantity: &str) -> Self {
        self.line.item.hsn_code = Some(code.to_string());
        self.line.item.quantity = d(quantity);
        self
    }

    pub(crate) fn operator(mut self, channel: &str) -> Self {
        self.line.provenance.origin_channel = channel.to_string();
        self.line.provenance.ecommerce_operator = Some(OPERATOR.to_string());
        self
    }

    pub(crate) fn cess(mut self, amount: &str) -> Self {
        self.line.cess_amount = d(amount);
        self
    }

    pub(crate) fn build(mut self) -> CanonicalInvoiceLine {
        let l = &mut self.line;
        if l.document_type == DocumentType::CreditNote && !l.taxable_value.is_sign_negative() {
            l.taxable_value = -l.taxable_value;
        }
        let negative = l.taxable_value.is_sign_negative() && !l.taxable_value.is_zero();
        l.flags.is_return = negative && !l.document_type.is_note();
        let intra = l.origin_jurisdiction_code == l.supply_jurisdiction_code;
        let intra = intra && !l.flags.is_export;
        let split = if l.flags.is_export && !l.flags.export_with_payment {
            TaxSplit::zero(false)
        } else {
            split_tax(l.taxable_value.abs(), l.tax_rate_percent, intra)
        };
        l.computed_tax = if negative { split.negate() } else { split };
        self.line
    }
}
