use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeeError {
    #[error("invalid payment: {0}")]
    InvalidPayment(String),
    #[error("payment of {amount} exceeds outstanding balance {balance}")]
    Overpayment { amount: f64, balance: f64 },
}

impl FeeError {
    pub fn code(&self) -> &'static str {
        match self {
            FeeError::InvalidPayment(_) => "invalid_payment",
            FeeError::Overpayment { .. } => "overpayment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Mobile Money")]
    MobileMoney,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::MobileMoney => "Mobile Money",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Cash" => Some(PaymentMethod::Cash),
            "Bank Transfer" => Some(PaymentMethod::BankTransfer),
            "Mobile Money" => Some(PaymentMethod::MobileMoney),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    Paid,
    Partial,
    Unpaid,
}

impl LedgerStatus {
    pub fn from_amounts(total_fees: f64, balance: f64) -> Self {
        if balance <= 0.0 {
            LedgerStatus::Paid
        } else if balance < total_fees {
            LedgerStatus::Partial
        } else {
            LedgerStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Paid => "Paid",
            LedgerStatus::Partial => "Partial",
            LedgerStatus::Unpaid => "Unpaid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Paid" => Some(LedgerStatus::Paid),
            "Partial" => Some(LedgerStatus::Partial),
            "Unpaid" => Some(LedgerStatus::Unpaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayment {
    pub id: String,
    pub amount: f64,
    pub payment_date: String,
    pub payment_method: PaymentMethod,
    pub receipt_number: String,
    pub received_by: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub amount: f64,
    pub payment_date: String,
    pub payment_method: PaymentMethod,
    pub receipt_number: String,
    pub received_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeLedger {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub academic_year: String,
    pub term: String,
    pub total_fees: f64,
    pub paid_amount: f64,
    pub balance: f64,
    pub payments: Vec<FeePayment>,
    pub status: LedgerStatus,
}

impl FeeLedger {
    pub fn open(
        id: String,
        student_id: String,
        student_name: String,
        class_id: String,
        academic_year: String,
        term: String,
        total_fees: f64,
    ) -> Result<Self, FeeError> {
        if !total_fees.is_finite() || total_fees < 0.0 {
            return Err(FeeError::InvalidPayment(
                "totalFees must be a non-negative amount".into(),
            ));
        }
        Ok(Self {
            id,
            student_id,
            student_name,
            class_id,
            academic_year,
            term,
            total_fees,
            paid_amount: 0.0,
            balance: total_fees,
            payments: Vec::new(),
            status: LedgerStatus::from_amounts(total_fees, total_fees),
        })
    }

    /// Validates the draft and returns the ledger with the payment recorded.
    pub fn with_payment(&self, draft: PaymentDraft, payment_id: String) -> Result<Self, FeeError> {
        validate_draft(&draft)?;
        if draft.amount > self.balance {
            return Err(FeeError::Overpayment {
                amount: draft.amount,
                balance: self.balance,
            });
        }

        let paid_amount = self.paid_amount + draft.amount;
        let balance = self.total_fees - paid_amount;
        let mut payments = self.payments.clone();
        payments.push(FeePayment {
            id: payment_id,
            amount: draft.amount,
            payment_date: draft.payment_date,
            payment_method: draft.payment_method,
            receipt_number: draft.receipt_number.trim().to_string(),
            received_by: draft.received_by.trim().to_string(),
        });

        Ok(Self {
            paid_amount,
            balance,
            payments,
            status: LedgerStatus::from_amounts(self.total_fees, balance),
            ..self.clone()
        })
    }
}

fn validate_draft(draft: &PaymentDraft) -> Result<(), FeeError> {
    if !draft.amount.is_finite() || draft.amount < 1.0 {
        return Err(FeeError::InvalidPayment("amount must be at least 1".into()));
    }
    if NaiveDate::parse_from_str(&draft.payment_date, "%Y-%m-%d").is_err() {
        return Err(FeeError::InvalidPayment(format!(
            "paymentDate must be YYYY-MM-DD (got '{}')",
            draft.payment_date
        )));
    }
    if draft.receipt_number.trim().is_empty() {
        return Err(FeeError::InvalidPayment("receipt number is required".into()));
    }
    if draft.received_by.trim().is_empty() {
        return Err(FeeError::InvalidPayment("receiver name is required".into()));
    }
    Ok(())
}
