//! Canonical field names that source headers are mapped onto.

pub const COUNTERPARTY_TAX_ID: &str = "counterparty_tax_id";
pub const COUNTERPARTY_NAME: &str = "counterparty_name";
pub const DOCUMENT_NUMBER: &str = "document_number";
pub const DOCUMENT_DATE: &str = "document_date";
pub const DOCUMENT_TYPE: &str = "document_type";
pub const TAXABLE_VALUE: &str = "taxable_value";
pub const SUPPLY_JURISDICTION: &str = "supply_jurisdiction";
pub const TAX_RATE_PERCENT: &str = "tax_rate_percent";
pub const CESS_AMOUNT: &str = "cess_amount";
pub const REVERSE_CHARGE: &str = "reverse_charge";
pub const IS_RETURN: &str = "is_return";
pub const SUPPLY_CATEGORY: &str = "supply_category";
pub const IS_ADVANCE: &str = "is_advance";
pub const IS_ADVANCE_ADJUSTMENT: &str = "is_advance_adjustment";
pub const EXPORT_TYPE: &str = "export_type";
pub const SHIPPING_BILL_NUMBER: &str = "shipping_bill_number";
pub const SHIPPING_BILL_DATE: &str = "shipping_bill_date";
pub const PORT_CODE: &str = "port_code";
pub const HSN_CODE: &str = "hsn_code";
pub const DESCRIPTION: &str = "description";
pub const UQC: &str = "uqc";
pub const QUANTITY: &str = "quantity";
pub const ECOMMERCE_OPERATOR_TAX_ID: &str = "ecommerce_operator_tax_id";
