use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError, commission, transition_conflict};
use crate::models::{
    Account, AvailabilityFilter, Category, Command, CommandScope, CommandStatus,
    CreateCategoryRequest, CreatePromoCodeRequest, Intervention, NewAccount, NewCommand,
    NewServiceProvider, Payment, PromoCode, Service, ServiceProvider, ServiceRequest,
    ServiceType, ServiceTypeRequest, SpState, SpStatus, UpdateCategoryRequest,
    UpdatePromoCodeRequest,
};

#[derive(Default)]
struct Store {
    accounts: Vec<Account>,
    categories: Vec<Category>,
    promo_codes: Vec<PromoCode>,
    service_types: Vec<ServiceType>,
    service_providers: Vec<ServiceProvider>,
    payments: Vec<Payment>,
    interventions: Vec<Intervention>,
    commands: Vec<Command>,
}

impl Store {
    fn provider_mut(&mut self, id: Uuid) -> Option<&mut ServiceProvider> {
        self.service_providers.iter_mut().find(|sp| sp.id == id)
    }
}

/// InMemoryRepository
///
/// A `Repository` over plain vectors behind one lock. Used by the test suite and for
/// running the API without a database; it enforces the same uniqueness and status rules
/// as the Postgres implementation.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a provider record as-is. Lets tests start from any status or balance.
    pub async fn insert_service_provider(&self, sp: ServiceProvider) -> ServiceProvider {
        self.store.write().await.service_providers.push(sp.clone());
        sp
    }

    pub async fn insert_command(&self, command: Command) -> Command {
        self.store.write().await.commands.push(command.clone());
        command
    }
}

fn modify<T: Clone>(items: &mut [T], matches: impl Fn(&T) -> bool, f: impl FnOnce(&mut T)) -> Option<T> {
    items.iter_mut().find(|item| matches(item)).map(|item| {
        f(item);
        item.clone()
    })
}

fn remove<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Option<T> {
    items
        .iter()
        .position(matches)
        .map(|index| items.remove(index))
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- ACCOUNTS ---

    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        let store = self.store.read().await;
        Ok(store.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        let store = self.store.read().await;
        Ok(store
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        let mut store = self.store.write().await;
        if store
            .accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(RepositoryError::Conflict("Email already registered.".into()));
        }
        let account = Account {
            id: Uuid::new_v4(),
            email: account.email.to_lowercase(),
            role: account.role,
            password_hash: account.password_hash,
            created_at: Utc::now(),
        };
        store.accounts.push(account.clone());
        Ok(account)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut categories = self.store.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(
        &self,
        req: CreateCategoryRequest,
        image: Option<String>,
    ) -> RepoResult<Category> {
        let mut store = self.store.write().await;
        let name = req.name.trim().to_string();
        if store.categories.iter().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict(
                "A category with this name already exists.".into(),
            ));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            image,
            created_at: now,
            updated_at: now,
        };
        store.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        let mut store = self.store.write().await;
        let name = req.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            if store.categories.iter().any(|c| c.id != id && &c.name == name) {
                return Err(RepositoryError::Conflict(
                    "A category with this name already exists.".into(),
                ));
            }
        }
        Ok(modify(&mut store.categories, |c| c.id == id, |c| {
            if let Some(name) = name {
                c.name = name;
            }
            if let Some(description) = req.description {
                c.description = Some(description);
            }
            c.updated_at = Utc::now();
        }))
    }

    async fn set_category_image(&self, id: Uuid, image: String) -> RepoResult<Option<Category>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.categories, |c| c.id == id, |c| {
            c.image = Some(image);
            c.updated_at = Utc::now();
        }))
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let mut store = self.store.write().await;
        Ok(remove(&mut store.categories, |c| c.id == id))
    }

    // --- PROMO CODES ---

    async fn list_promo_codes(&self) -> RepoResult<Vec<PromoCode>> {
        let mut codes = self.store.read().await.promo_codes.clone();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn get_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>> {
        let store = self.store.read().await;
        Ok(store.promo_codes.iter().find(|p| p.id == id).cloned())
    }

    async fn find_promo_code(&self, code: &str) -> RepoResult<Option<PromoCode>> {
        let code = code.to_uppercase();
        let store = self.store.read().await;
        Ok(store.promo_codes.iter().find(|p| p.code == code).cloned())
    }

    async fn create_promo_code(&self, req: CreatePromoCodeRequest) -> RepoResult<PromoCode> {
        let mut store = self.store.write().await;
        let code = req.code.to_uppercase();
        if store.promo_codes.iter().any(|p| p.code == code) {
            return Err(RepositoryError::Conflict("This promo code already exists.".into()));
        }
        let now = Utc::now();
        let promo = PromoCode {
            id: Uuid::new_v4(),
            code,
            discount: req.discount,
            expires_at: req.expires_at,
            active: req.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        store.promo_codes.push(promo.clone());
        Ok(promo)
    }

    async fn update_promo_code(
        &self,
        id: Uuid,
        req: UpdatePromoCodeRequest,
    ) -> RepoResult<Option<PromoCode>> {
        let mut store = self.store.write().await;
        let code = req.code.map(|c| c.to_uppercase());
        if let Some(code) = &code {
            if store.promo_codes.iter().any(|p| p.id != id && &p.code == code) {
                return Err(RepositoryError::Conflict("This promo code already exists.".into()));
            }
        }
        Ok(modify(&mut store.promo_codes, |p| p.id == id, |p| {
            if let Some(code) = code {
                p.code = code;
            }
            if let Some(discount) = req.discount {
                p.discount = discount;
            }
            if let Some(expires_at) = req.expires_at {
                p.expires_at = expires_at;
            }
            if let Some(active) = req.active {
                p.active = active;
            }
            p.updated_at = Utc::now();
        }))
    }

    async fn delete_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>> {
        let mut store = self.store.write().await;
        Ok(remove(&mut store.promo_codes, |p| p.id == id))
    }

    // --- SERVICE TYPES ---

    async fn list_service_types(&self) -> RepoResult<Vec<ServiceType>> {
        let mut types = self.store.read().await.service_types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn get_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>> {
        let store = self.store.read().await;
        Ok(store.service_types.iter().find(|t| t.id == id).cloned())
    }

    async fn create_service_type(&self, req: ServiceTypeRequest) -> RepoResult<ServiceType> {
        let mut store = self.store.write().await;
        let name = req.name.trim().to_string();
        if store.service_types.iter().any(|t| t.name == name) {
            return Err(RepositoryError::Conflict(
                "A service type with this name already exists.".into(),
            ));
        }
        let now = Utc::now();
        let service_type = ServiceType {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            services: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        store.service_types.push(service_type.clone());
        Ok(service_type)
    }

    async fn update_service_type(
        &self,
        id: Uuid,
        req: ServiceTypeRequest,
    ) -> RepoResult<Option<ServiceType>> {
        let mut store = self.store.write().await;
        let name = req.name.trim().to_string();
        if store.service_types.iter().any(|t| t.id != id && t.name == name) {
            return Err(RepositoryError::Conflict(
                "A service type with this name already exists.".into(),
            ));
        }
        Ok(modify(&mut store.service_types, |t| t.id == id, |t| {
            t.name = name;
            t.description = req.description;
            t.updated_at = Utc::now();
        }))
    }

    async fn delete_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>> {
        let mut store = self.store.write().await;
        Ok(remove(&mut store.service_types, |t| t.id == id))
    }

    async fn add_service(
        &self,
        type_id: Uuid,
        req: ServiceRequest,
    ) -> RepoResult<Option<ServiceType>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_types, |t| t.id == type_id, |t| {
            t.services.push(Service {
                id: Uuid::new_v4(),
                name: req.name.trim().to_string(),
                description: req.description,
                price: req.price,
            });
            t.updated_at = Utc::now();
        }))
    }

    async fn remove_service(
        &self,
        type_id: Uuid,
        service_id: Uuid,
    ) -> RepoResult<Option<ServiceType>> {
        let mut store = self.store.write().await;
        let Some(service_type) = store.service_types.iter_mut().find(|t| t.id == type_id) else {
            return Ok(None);
        };
        if remove(&mut service_type.services, |s| s.id == service_id).is_none() {
            return Err(RepositoryError::NotFound("service"));
        }
        service_type.updated_at = Utc::now();
        Ok(Some(service_type.clone()))
    }

    // --- SERVICE PROVIDERS ---

    async fn list_service_providers(
        &self,
        status: Option<SpStatus>,
    ) -> RepoResult<Vec<ServiceProvider>> {
        let store = self.store.read().await;
        let mut providers: Vec<ServiceProvider> = store
            .service_providers
            .iter()
            .filter(|sp| status.is_none_or(|s| sp.status == s))
            .cloned()
            .collect();
        providers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(providers)
    }

    async fn list_available_providers(
        &self,
        filter: &AvailabilityFilter,
    ) -> RepoResult<Vec<ServiceProvider>> {
        let store = self.store.read().await;
        let mut providers: Vec<ServiceProvider> = store
            .service_providers
            .iter()
            .filter(|sp| filter.matches(sp))
            .cloned()
            .collect();
        providers.sort_by(|a, b| {
            b.rating
                .unwrap_or(f64::MIN)
                .total_cmp(&a.rating.unwrap_or(f64::MIN))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(providers)
    }

    async fn list_emergency_ready(&self) -> RepoResult<Vec<ServiceProvider>> {
        let store = self.store.read().await;
        Ok(store
            .service_providers
            .iter()
            .filter(|sp| {
                sp.status == SpStatus::Validated
                    && sp.state == SpState::EmergencyReady
                    && sp.location().is_some()
            })
            .cloned()
            .collect())
    }

    async fn get_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        let store = self.store.read().await;
        Ok(store.service_providers.iter().find(|sp| sp.id == id).cloned())
    }

    async fn phone_registered(&self, phone: &str) -> RepoResult<bool> {
        let store = self.store.read().await;
        Ok(store.service_providers.iter().any(|sp| sp.phone == phone))
    }

    async fn create_service_provider(
        &self,
        sp: NewServiceProvider,
    ) -> RepoResult<ServiceProvider> {
        let mut store = self.store.write().await;
        if store.service_providers.iter().any(|p| p.phone == sp.phone) {
            return Err(RepositoryError::Conflict(
                "This phone number is already registered.".into(),
            ));
        }
        if store
            .service_providers
            .iter()
            .any(|p| p.email.eq_ignore_ascii_case(&sp.email))
        {
            return Err(RepositoryError::Conflict("This email is already registered.".into()));
        }

        let now = Utc::now();
        let provider = ServiceProvider {
            id: Uuid::new_v4(),
            phone: sp.phone,
            firstname: sp.firstname,
            lastname: sp.lastname,
            gender: sp.gender,
            birthdate: sp.birthdate,
            wilaya: sp.wilaya,
            commune: sp.commune,
            job_title: sp.job_title,
            description: sp.description,
            email: sp.email.to_lowercase(),
            balance: 0.0,
            amount_to_pay: 0.0,
            percent_to_pay: 0.0,
            latitude: sp.latitude,
            longitude: sp.longitude,
            rating: sp.rating,
            services: sp.services,
            picture: sp.picture,
            birth_certificate: sp.birth_certificate,
            residence_certificate: sp.residence_certificate,
            id_card: sp.id_card,
            criminal_record: sp.criminal_record,
            diplomas: sp.diplomas,
            state: SpState::NotReady,
            status: SpStatus::NotValidated,
            created_at: now,
            updated_at: now,
        };
        store.service_providers.push(provider.clone());
        Ok(provider)
    }

    async fn validate_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.status = SpStatus::Validated;
            sp.updated_at = Utc::now();
        }))
    }

    async fn ban_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.status = SpStatus::Banned;
            sp.state = SpState::NotReady;
            sp.updated_at = Utc::now();
        }))
    }

    async fn set_provider_state(
        &self,
        id: Uuid,
        state: SpState,
    ) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.state = state;
            sp.updated_at = Utc::now();
        }))
    }

    async fn set_provider_services(
        &self,
        id: Uuid,
        services: Vec<String>,
    ) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.services = services;
            sp.updated_at = Utc::now();
        }))
    }

    async fn set_provider_picture(
        &self,
        id: Uuid,
        picture: String,
    ) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.picture = Some(picture);
            sp.updated_at = Utc::now();
        }))
    }

    async fn set_percent_to_pay(
        &self,
        id: Uuid,
        percent: f64,
    ) -> RepoResult<Option<ServiceProvider>> {
        let mut store = self.store.write().await;
        Ok(modify(&mut store.service_providers, |sp| sp.id == id, |sp| {
            sp.percent_to_pay = percent;
            sp.updated_at = Utc::now();
        }))
    }

    // --- PAYMENTS & INTERVENTIONS ---

    async fn list_payments(&self, provider_id: Uuid) -> RepoResult<Vec<Payment>> {
        let store = self.store.read().await;
        let mut payments: Vec<Payment> = store
            .payments
            .iter()
            .filter(|p| p.service_provider_id == provider_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(payments)
    }

    async fn add_payment(
        &self,
        provider_id: Uuid,
        amount: f64,
        date: DateTime<Utc>,
    ) -> RepoResult<Option<Payment>> {
        let mut store = self.store.write().await;
        let Some(sp) = store.provider_mut(provider_id) else {
            return Ok(None);
        };
        sp.amount_to_pay = (sp.amount_to_pay - amount).max(0.0);
        sp.updated_at = Utc::now();

        let payment = Payment {
            id: Uuid::new_v4(),
            service_provider_id: provider_id,
            amount,
            date,
        };
        store.payments.push(payment.clone());
        Ok(Some(payment))
    }

    async fn list_interventions(&self, provider_id: Uuid) -> RepoResult<Vec<Intervention>> {
        let store = self.store.read().await;
        let mut interventions: Vec<Intervention> = store
            .interventions
            .iter()
            .filter(|i| i.service_provider_id == provider_id)
            .cloned()
            .collect();
        interventions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(interventions)
    }

    // --- COMMANDS ---

    async fn list_commands(&self, scope: CommandScope) -> RepoResult<Vec<Command>> {
        let store = self.store.read().await;
        let mut commands: Vec<Command> = store
            .commands
            .iter()
            .filter(|c| scope.includes(c))
            .cloned()
            .collect();
        commands.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(commands)
    }

    async fn get_command(&self, id: Uuid) -> RepoResult<Option<Command>> {
        let store = self.store.read().await;
        Ok(store.commands.iter().find(|c| c.id == id).cloned())
    }

    async fn create_command(&self, command: NewCommand) -> RepoResult<Command> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let command = Command {
            id: Uuid::new_v4(),
            client_id: command.client_id,
            service_provider_id: command.service_provider_id,
            service_type_id: command.service_type_id,
            kind: command.kind,
            description: command.description,
            address: command.address,
            price: command.price,
            promo_code: command.promo_code,
            discount: command.discount,
            total: command.total,
            status: CommandStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.commands.push(command.clone());
        Ok(command)
    }

    async fn update_command_status(
        &self,
        id: Uuid,
        next: CommandStatus,
    ) -> RepoResult<Option<Command>> {
        let mut store = self.store.write().await;
        let Some(index) = store.commands.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let current = &store.commands[index];
        if !current.status.can_transition_to(next) {
            return Err(transition_conflict(current.status, next));
        }
        let (provider_id, total) = (current.service_provider_id, current.total);

        // Every check happens before the first write.
        if next == CommandStatus::Completed {
            let sp = store
                .provider_mut(provider_id)
                .ok_or(RepositoryError::NotFound("service provider"))?;
            sp.balance += total;
            sp.amount_to_pay += commission(total, sp.percent_to_pay);
            sp.updated_at = Utc::now();

            store.interventions.push(Intervention {
                id: Uuid::new_v4(),
                service_provider_id: provider_id,
                command_id: id,
                amount: total,
                created_at: Utc::now(),
            });
        }

        let command = &mut store.commands[index];
        command.status = next;
        command.updated_at = Utc::now();
        Ok(Some(command.clone()))
    }

    async fn delete_command(&self, id: Uuid) -> RepoResult<Option<Command>> {
        let mut store = self.store.write().await;
        Ok(remove(&mut store.commands, |c| c.id == id))
    }
}
