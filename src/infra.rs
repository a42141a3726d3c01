//! In-memory implementations of the routing collaborators, shared by the
//! HTTP service defaults, the CLI demo, and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;

use crate::routing::{
    ActivityLogEntry, AssignmentLogEntry, AssignmentUpdate, AuditLogSink, IndustryCatalog,
    IndustryId, Lead, LeadFilter, LeadId, LeadStatus, LeadStore, LeadSummary, MonthlyUsage,
    NotificationSink, Partner, PartnerDirectory, PartnerId, PaymentMethod, PaymentMethodStatus,
    PaymentStore, PerformanceStats, QuotaStore, RouterSettings, RoutingStores, SettingsStore,
    StatsProvider, StoreError, Subscription,
};

#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: Mutex<HashMap<LeadId, Lead>>,
}

impl InMemoryLeadStore {
    pub fn insert(&self, lead: Lead) {
        let mut guard = self.leads.lock().expect("lead store mutex poisoned");
        guard.insert(lead.id.clone(), lead);
    }
}

impl LeadStore for InMemoryLeadStore {
    fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_lead_assignment(
        &self,
        id: &LeadId,
        update: AssignmentUpdate,
    ) -> Result<Lead, StoreError> {
        let mut guard = self.leads.lock().expect("lead store mutex poisoned");
        let lead = guard.get_mut(id).ok_or(StoreError::NotFound)?;

        lead.assigned_to = Some(update.assigned_to);
        lead.assigned_by = Some(update.assigned_by);
        lead.status = update.status;
        lead.assignment_score = Some(update.score);
        lead.assignment_factors = Some(update.factors);
        lead.assigned_at = Some(update.assigned_at);
        lead.accepted_at = Some(update.accepted_at);

        Ok(lead.clone())
    }

    fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead store mutex poisoned");
        let mut leads: Vec<Lead> = guard
            .values()
            .filter(|lead| filter.status.map_or(true, |status| lead.status == status))
            .filter(|lead| !filter.unassigned_only || lead.assigned_to.is_none())
            .cloned()
            .collect();
        leads.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(leads)
    }
}

#[derive(Default)]
pub struct InMemoryPartnerDirectory {
    partners: Mutex<HashMap<PartnerId, Partner>>,
    preferences: Mutex<HashMap<PartnerId, Vec<IndustryId>>>,
}

impl InMemoryPartnerDirectory {
    pub fn insert(&self, partner: Partner) {
        let mut guard = self.partners.lock().expect("directory mutex poisoned");
        guard.insert(partner.id.clone(), partner);
    }

    pub fn enable_industries(&self, partner_id: &PartnerId, industries: Vec<IndustryId>) {
        let mut guard = self.preferences.lock().expect("directory mutex poisoned");
        guard.insert(partner_id.clone(), industries);
    }
}

impl PartnerDirectory for InMemoryPartnerDirectory {
    fn list_active_routing_partners(&self) -> Result<Vec<Partner>, StoreError> {
        let guard = self.partners.lock().expect("directory mutex poisoned");
        let mut partners: Vec<Partner> = guard
            .values()
            .filter(|partner| partner.is_active_for_routing)
            .cloned()
            .collect();
        partners.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(partners)
    }

    fn get_partner(&self, id: &PartnerId) -> Result<Option<Partner>, StoreError> {
        let guard = self.partners.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_enabled_industry_preferences(
        &self,
        partner_id: &PartnerId,
    ) -> Result<Vec<IndustryId>, StoreError> {
        let guard = self.preferences.lock().expect("directory mutex poisoned");
        Ok(guard.get(partner_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryIndustryCatalog {
    industries: Mutex<HashMap<IndustryId, IndustryRecord>>,
}

#[derive(Clone)]
struct IndustryRecord {
    name: String,
    price_per_lead: Option<Decimal>,
}

impl InMemoryIndustryCatalog {
    pub fn insert(&self, id: IndustryId, name: &str, price_per_lead: Option<Decimal>) {
        let mut guard = self.industries.lock().expect("catalog mutex poisoned");
        guard.insert(
            id,
            IndustryRecord {
                name: name.to_string(),
                price_per_lead,
            },
        );
    }
}

impl IndustryCatalog for InMemoryIndustryCatalog {
    fn industry_name(&self, id: &IndustryId) -> Result<Option<String>, StoreError> {
        let guard = self.industries.lock().expect("catalog mutex poisoned");
        Ok(guard.get(id).map(|record| record.name.clone()))
    }

    fn price_per_lead(&self, id: &IndustryId) -> Result<Option<Decimal>, StoreError> {
        let guard = self.industries.lock().expect("catalog mutex poisoned");
        Ok(guard.get(id).and_then(|record| record.price_per_lead))
    }
}

#[derive(Default)]
pub struct InMemoryStatsProvider {
    stats: Mutex<HashMap<PartnerId, PerformanceStats>>,
}

impl InMemoryStatsProvider {
    pub fn insert(&self, partner_id: PartnerId, stats: PerformanceStats) {
        let mut guard = self.stats.lock().expect("stats mutex poisoned");
        guard.insert(partner_id, stats);
    }
}

impl StatsProvider for InMemoryStatsProvider {
    fn list_performance_stats(&self) -> Result<Vec<(PartnerId, PerformanceStats)>, StoreError> {
        let guard = self.stats.lock().expect("stats mutex poisoned");
        Ok(guard
            .iter()
            .map(|(id, stats)| (id.clone(), stats.clone()))
            .collect())
    }

    fn stats_for(&self, partner_id: &PartnerId) -> Result<Option<PerformanceStats>, StoreError> {
        let guard = self.stats.lock().expect("stats mutex poisoned");
        Ok(guard.get(partner_id).cloned())
    }
}

pub struct InMemorySettingsStore {
    settings: Mutex<RouterSettings>,
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self {
            settings: Mutex::new(RouterSettings::default()),
        }
    }
}

impl InMemorySettingsStore {
    pub fn set(&self, settings: RouterSettings) {
        let mut guard = self.settings.lock().expect("settings mutex poisoned");
        *guard = settings;
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn router_settings(&self) -> Result<RouterSettings, StoreError> {
        let guard = self.settings.lock().expect("settings mutex poisoned");
        Ok(guard.clone())
    }
}

/// Quota store whose monthly usage is derived from the lead store, the same
/// way the production view counts a partner's accepted and approved leads in
/// the current calendar month.
pub struct InMemoryQuotaStore {
    subscriptions: Mutex<HashMap<PartnerId, Vec<Subscription>>>,
    leads: Arc<InMemoryLeadStore>,
}

impl InMemoryQuotaStore {
    pub fn new(leads: Arc<InMemoryLeadStore>) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            leads,
        }
    }

    pub fn set_subscriptions(&self, partner_id: PartnerId, subscriptions: Vec<Subscription>) {
        let mut guard = self
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned");
        guard.insert(partner_id, subscriptions);
    }
}

impl QuotaStore for InMemoryQuotaStore {
    fn subscriptions(&self, partner_id: &PartnerId) -> Result<Vec<Subscription>, StoreError> {
        let guard = self
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned");
        Ok(guard.get(partner_id).cloned().unwrap_or_default())
    }

    fn monthly_usage(&self, partner_id: &PartnerId) -> Result<MonthlyUsage, StoreError> {
        let now = Utc::now();
        let leads = self.leads.list_leads(&LeadFilter::default())?;

        let mut usage = MonthlyUsage::default();
        for lead in leads {
            if lead.assigned_to.as_ref() != Some(partner_id) {
                continue;
            }
            let in_current_month = lead
                .accepted_at
                .or(lead.assigned_at)
                .is_some_and(|at| at.year() == now.year() && at.month() == now.month());
            if !in_current_month {
                continue;
            }

            match lead.status {
                LeadStatus::Accepted => usage.effective_count += 1,
                LeadStatus::Approved | LeadStatus::Paid => {
                    usage.effective_count += 1;
                    usage.approved_count += 1;
                }
                _ => {}
            }
        }

        Ok(usage)
    }
}

#[derive(Default)]
pub struct InMemoryPaymentStore {
    methods: Mutex<HashMap<PartnerId, Vec<PaymentMethod>>>,
    balances: Mutex<HashMap<PartnerId, Decimal>>,
}

impl InMemoryPaymentStore {
    pub fn set_methods(&self, partner_id: PartnerId, methods: Vec<PaymentMethod>) {
        let mut guard = self.methods.lock().expect("payment mutex poisoned");
        guard.insert(partner_id, methods);
    }

    pub fn set_balance(&self, partner_id: PartnerId, balance: Decimal) {
        let mut guard = self.balances.lock().expect("balance mutex poisoned");
        guard.insert(partner_id, balance);
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn payment_methods(
        &self,
        partner_id: &PartnerId,
        statuses: &[PaymentMethodStatus],
    ) -> Result<Vec<PaymentMethod>, StoreError> {
        let guard = self.methods.lock().expect("payment mutex poisoned");
        Ok(guard
            .get(partner_id)
            .map(|methods| {
                methods
                    .iter()
                    .filter(|method| statuses.contains(&method.status))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn balance(&self, partner_id: &PartnerId) -> Result<Decimal, StoreError> {
        let guard = self.balances.lock().expect("balance mutex poisoned");
        Ok(guard.get(partner_id).copied().unwrap_or_default())
    }

    fn update_balance(
        &self,
        partner_id: &PartnerId,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut guard = self.balances.lock().expect("balance mutex poisoned");
        guard.insert(partner_id.clone(), new_balance);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotificationSink {
    events: Mutex<Vec<(PartnerId, LeadSummary)>>,
}

impl RecordingNotificationSink {
    pub fn events(&self) -> Vec<(PartnerId, LeadSummary)> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify_lead_assigned(
        &self,
        partner_id: &PartnerId,
        summary: LeadSummary,
    ) -> Result<bool, StoreError> {
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push((partner_id.clone(), summary));
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    assignments: Mutex<Vec<AssignmentLogEntry>>,
    activities: Mutex<Vec<ActivityLogEntry>>,
}

impl InMemoryAuditLog {
    pub fn assignment_entries(&self) -> Vec<AssignmentLogEntry> {
        self.assignments.lock().expect("audit mutex poisoned").clone()
    }

    pub fn activity_entries(&self) -> Vec<ActivityLogEntry> {
        self.activities.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditLogSink for InMemoryAuditLog {
    fn append_assignment_log(&self, entry: AssignmentLogEntry) -> Result<(), StoreError> {
        let mut guard = self.assignments.lock().expect("audit mutex poisoned");
        guard.push(entry);
        Ok(())
    }

    fn append_activity_log(&self, entry: ActivityLogEntry) -> Result<(), StoreError> {
        let mut guard = self.activities.lock().expect("audit mutex poisoned");
        guard.push(entry);
        Ok(())
    }
}

/// Bundle of concrete in-memory stores, kept around so callers can seed data
/// and inspect side effects while the service only sees the trait objects.
pub struct InMemoryBackend {
    pub leads: Arc<InMemoryLeadStore>,
    pub partners: Arc<InMemoryPartnerDirectory>,
    pub industries: Arc<InMemoryIndustryCatalog>,
    pub stats: Arc<InMemoryStatsProvider>,
    pub settings: Arc<InMemorySettingsStore>,
    pub quota: Arc<InMemoryQuotaStore>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub notifications: Arc<RecordingNotificationSink>,
    pub audit: Arc<InMemoryAuditLog>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let leads = Arc::new(InMemoryLeadStore::default());
        Self {
            quota: Arc::new(InMemoryQuotaStore::new(leads.clone())),
            leads,
            partners: Arc::new(InMemoryPartnerDirectory::default()),
            industries: Arc::new(InMemoryIndustryCatalog::default()),
            stats: Arc::new(InMemoryStatsProvider::default()),
            settings: Arc::new(InMemorySettingsStore::default()),
            payments: Arc::new(InMemoryPaymentStore::default()),
            notifications: Arc::new(RecordingNotificationSink::default()),
            audit: Arc::new(InMemoryAuditLog::default()),
        }
    }

    pub fn stores(&self) -> RoutingStores {
        RoutingStores {
            leads: self.leads.clone(),
            partners: self.partners.clone(),
            industries: self.industries.clone(),
            stats: self.stats.clone(),
            settings: self.settings.clone(),
            quota: self.quota.clone(),
            payments: self.payments.clone(),
            notifications: self.notifications.clone(),
            audit: self.audit.clone(),
        }
    }
}
