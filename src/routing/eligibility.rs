use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::domain::{
    IndustryId, Lead, PartnerId, PaymentMethodKind, PaymentMethodStatus, SubscriptionStatus,
};
use super::repository::{IndustryCatalog, PartnerDirectory, PaymentStore, QuotaStore, StoreError};

/// Flat price charged for a lead whose industry has no configured price.
const DEFAULT_LEAD_PRICE: Decimal = dec!(10.00);

/// Eligibility failure kinds. All of these are expected, user-recoverable
/// conditions: each carries the numbers the caller needs to render an
/// explanatory message, and none is ever logged as a system error.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityError {
    #[error("partner has no access to the lead's industry")]
    IndustryMismatch { industry: Option<IndustryId> },
    #[error("partner has no active quota")]
    NoQuota,
    #[error("lead delivery for this partner is paused")]
    PartnerPaused,
    #[error("partner has reached their quota ({used}/{quota})")]
    QuotaExceeded { used: u32, quota: u32 },
    #[error("partner has no active payment method")]
    NoPaymentMethod,
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
}

/// Everything the gate resolved on a passing evaluation, attached so the
/// caller can commit without re-fetching.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityContext {
    pub partner_id: PartnerId,
    pub remaining_quota: u32,
    pub has_sepa_mandate: bool,
    pub has_credit_card: bool,
    pub balance: Decimal,
    pub lead_price: Decimal,
}

/// Failure of one gate evaluation: either the partner is ineligible (an
/// expected outcome) or a collaborator misbehaved (a dependency failure).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Ineligible(#[from] EligibilityError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request-time guard evaluating industry access, subscription quota, pause
/// state, and payment-method/balance sufficiency. Stateless: every check runs
/// fresh against the stores on each call.
pub struct EligibilityGate {
    partners: Arc<dyn PartnerDirectory>,
    industries: Arc<dyn IndustryCatalog>,
    quota: Arc<dyn QuotaStore>,
    payments: Arc<dyn PaymentStore>,
}

impl EligibilityGate {
    pub fn new(
        partners: Arc<dyn PartnerDirectory>,
        industries: Arc<dyn IndustryCatalog>,
        quota: Arc<dyn QuotaStore>,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            partners,
            industries,
            quota,
            payments,
        }
    }

    /// Run the full eligibility sequence for assigning `lead` to `partner_id`.
    ///
    /// Checks run in a fixed order but each fails closed independently, so
    /// reordering them would not change the outcome for a case that fails
    /// several at once.
    pub fn check(
        &self,
        lead: &Lead,
        partner_id: &PartnerId,
    ) -> Result<EligibilityContext, GateError> {
        self.check_industry_access(lead, partner_id)?;
        let (total_quota, used) = self.check_quota(partner_id)?;
        let remaining_quota = total_quota - used;
        let (has_sepa_mandate, has_credit_card, balance, lead_price) =
            self.check_payment(lead, partner_id)?;

        Ok(EligibilityContext {
            partner_id: partner_id.clone(),
            remaining_quota,
            has_sepa_mandate,
            has_credit_card,
            balance,
            lead_price,
        })
    }

    /// The lead's industry must be among the partner's enabled preferences.
    /// A lead without an industry never matches: the gate fails closed.
    fn check_industry_access(&self, lead: &Lead, partner_id: &PartnerId) -> Result<(), GateError> {
        let preferences = self.partners.list_enabled_industry_preferences(partner_id)?;

        let has_access = lead
            .industry
            .as_ref()
            .is_some_and(|industry| preferences.contains(industry));

        if !has_access {
            return Err(EligibilityError::IndustryMismatch {
                industry: lead.industry.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Sum quota across active/paused subscriptions (unbounded rows carry no
    /// countable quota), reject paused partners, and compare against the
    /// current month's effective usage.
    fn check_quota(&self, partner_id: &PartnerId) -> Result<(u32, u32), GateError> {
        let subscriptions = self.quota.subscriptions(partner_id)?;

        let counted = subscriptions.iter().filter(|sub| {
            matches!(
                sub.status,
                SubscriptionStatus::Active | SubscriptionStatus::Paused
            )
        });
        let total_quota: u32 = counted
            .clone()
            .filter_map(|sub| sub.leads_per_month)
            .sum();

        if total_quota == 0 {
            return Err(EligibilityError::NoQuota.into());
        }

        let is_paused = counted
            .clone()
            .any(|sub| sub.is_paused || sub.status == SubscriptionStatus::Paused);
        if is_paused {
            return Err(EligibilityError::PartnerPaused.into());
        }

        let usage = self.quota.monthly_usage(partner_id)?;
        let used = usage.effective_count;
        if used >= total_quota {
            return Err(EligibilityError::QuotaExceeded {
                used,
                quota: total_quota,
            }
            .into());
        }

        Ok((total_quota, used))
    }

    /// At least one active/pending payment method must exist. Partners
    /// without an active SEPA mandate bill from their prepaid balance, so a
    /// card-only partner must cover the lead price up front; mandate holders
    /// defer settlement to periodic billing and skip the balance check.
    fn check_payment(
        &self,
        lead: &Lead,
        partner_id: &PartnerId,
    ) -> Result<(bool, bool, Decimal, Decimal), GateError> {
        let methods = self.payments.payment_methods(
            partner_id,
            &[PaymentMethodStatus::Active, PaymentMethodStatus::Pending],
        )?;

        if methods.is_empty() {
            return Err(EligibilityError::NoPaymentMethod.into());
        }

        let has_sepa_mandate = methods.iter().any(|method| {
            method.kind == PaymentMethodKind::Sepa && method.status == PaymentMethodStatus::Active
        });
        let has_credit_card = methods
            .iter()
            .any(|method| method.kind == PaymentMethodKind::CreditCard);

        let balance = self.payments.balance(partner_id)?;
        let lead_price = self.resolve_lead_price(lead)?;

        if !has_sepa_mandate && has_credit_card && balance < lead_price {
            return Err(EligibilityError::InsufficientBalance {
                required: lead_price,
                available: balance,
            }
            .into());
        }

        Ok((has_sepa_mandate, has_credit_card, balance, lead_price))
    }

    fn resolve_lead_price(&self, lead: &Lead) -> Result<Decimal, StoreError> {
        let price = match &lead.industry {
            Some(industry) => self.industries.price_per_lead(industry)?,
            None => None,
        };
        Ok(price.unwrap_or(DEFAULT_LEAD_PRICE))
    }
}
