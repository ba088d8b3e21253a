use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError, commission, transition_conflict};
use crate::models::{
    Account, AvailabilityFilter, Category, Command, CommandScope, CommandStatus,
    CreateCategoryRequest, CreatePromoCodeRequest, Intervention, NewAccount, NewCommand,
    NewServiceProvider, Payment, PromoCode, ServiceProvider, ServiceRequest, ServiceType,
    ServiceTypeRequest, SpState, SpStatus, UpdateCategoryRequest, UpdatePromoCodeRequest,
};

/// Service types carry their services as a JSON array aggregated from `services`.
const SERVICE_TYPE_SELECT: &str = r#"
    SELECT t.id, t.name, t.description, t.created_at, t.updated_at,
        COALESCE(
            (SELECT json_agg(
                json_build_object('id', s.id, 'name', s.name, 'description', s.description, 'price', s.price)
                ORDER BY s.created_at)
             FROM services s WHERE s.service_type_id = t.id),
            '[]'::json
        ) AS services
    FROM service_types t
"#;

/// Turns a unique violation into a `Conflict`, picking the message by constraint name.
fn conflict_on_unique(
    err: sqlx::Error,
    messages: &[(&str, &str)],
    fallback: &str,
) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = db
                .constraint()
                .and_then(|name| messages.iter().find(|(c, _)| *c == name))
                .map(|(_, m)| *m)
                .unwrap_or(fallback);
            return RepositoryError::Conflict(message.to_string());
        }
    }
    RepositoryError::Database(err)
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ACCOUNTS ---

    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        Ok(sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        Ok(
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (id, email, password_hash, role)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(account.email.to_lowercase())
        .bind(account.password_hash)
        .bind(account.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "Email already registered."))
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(
        &self,
        req: CreateCategoryRequest,
        image: Option<String>,
    ) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, name, description, image)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.description)
        .bind(image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "A category with this name already exists."))
    }

    /// Partial update: `COALESCE` keeps columns whose field is `None`.
    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   updated_at = now()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "A category with this name already exists."))
    }

    async fn set_category_image(&self, id: Uuid, image: String) -> RepoResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "UPDATE categories SET image = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // --- PROMO CODES ---

    async fn list_promo_codes(&self) -> RepoResult<Vec<PromoCode>> {
        Ok(
            sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>> {
        Ok(sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_promo_code(&self, code: &str) -> RepoResult<Option<PromoCode>> {
        Ok(sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE code = $1")
            .bind(code.to_uppercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_promo_code(&self, req: CreatePromoCodeRequest) -> RepoResult<PromoCode> {
        sqlx::query_as::<_, PromoCode>(
            r#"INSERT INTO promo_codes (id, code, discount, expires_at, active)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(req.code.to_uppercase())
        .bind(req.discount)
        .bind(req.expires_at)
        .bind(req.active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "This promo code already exists."))
    }

    async fn update_promo_code(
        &self,
        id: Uuid,
        req: UpdatePromoCodeRequest,
    ) -> RepoResult<Option<PromoCode>> {
        sqlx::query_as::<_, PromoCode>(
            r#"UPDATE promo_codes
               SET code = COALESCE($2, code),
                   discount = COALESCE($3, discount),
                   expires_at = CASE WHEN $4 THEN $5 ELSE expires_at END,
                   active = COALESCE($6, active),
                   updated_at = now()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(req.code.map(|c| c.to_uppercase()))
        .bind(req.discount)
        .bind(req.expires_at.is_some())
        .bind(req.expires_at.flatten())
        .bind(req.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "This promo code already exists."))
    }

    async fn delete_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>> {
        Ok(
            sqlx::query_as::<_, PromoCode>("DELETE FROM promo_codes WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // --- SERVICE TYPES ---

    async fn list_service_types(&self) -> RepoResult<Vec<ServiceType>> {
        let sql = format!("{SERVICE_TYPE_SELECT} ORDER BY t.name");
        Ok(sqlx::query_as::<_, ServiceType>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>> {
        let sql = format!("{SERVICE_TYPE_SELECT} WHERE t.id = $1");
        Ok(sqlx::query_as::<_, ServiceType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_service_type(&self, req: ServiceTypeRequest) -> RepoResult<ServiceType> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO service_types (id, name, description) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(req.name.trim())
            .bind(req.description)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, &[], "A service type with this name already exists."))?;

        self.get_service_type(id)
            .await?
            .ok_or(RepositoryError::NotFound("service type"))
    }

    async fn update_service_type(
        &self,
        id: Uuid,
        req: ServiceTypeRequest,
    ) -> RepoResult<Option<ServiceType>> {
        let updated = sqlx::query(
            "UPDATE service_types SET name = $2, description = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(req.description)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &[], "A service type with this name already exists."))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_service_type(id).await
    }

    async fn delete_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>> {
        let Some(service_type) = self.get_service_type(id).await? else {
            return Ok(None);
        };
        // Services go with their type (ON DELETE CASCADE).
        sqlx::query("DELETE FROM service_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(Some(service_type))
    }

    async fn add_service(
        &self,
        type_id: Uuid,
        req: ServiceRequest,
    ) -> RepoResult<Option<ServiceType>> {
        let mut tx = self.pool.begin().await?;
        let touched = sqlx::query("UPDATE service_types SET updated_at = now() WHERE id = $1")
            .bind(type_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }
        sqlx::query(
            r#"INSERT INTO services (id, service_type_id, name, description, price)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::new_v4())
        .bind(type_id)
        .bind(req.name.trim())
        .bind(req.description)
        .bind(req.price)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_service_type(type_id).await
    }

    async fn remove_service(
        &self,
        type_id: Uuid,
        service_id: Uuid,
    ) -> RepoResult<Option<ServiceType>> {
        if self.get_service_type(type_id).await?.is_none() {
            return Ok(None);
        }
        let deleted = sqlx::query("DELETE FROM services WHERE id = $1 AND service_type_id = $2")
            .bind(service_id)
            .bind(type_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("service"));
        }
        sqlx::query("UPDATE service_types SET updated_at = now() WHERE id = $1")
            .bind(type_id)
            .execute(&self.pool)
            .await?;

        self.get_service_type(type_id).await
    }

    // --- SERVICE PROVIDERS ---

    async fn list_service_providers(
        &self,
        status: Option<SpStatus>,
    ) -> RepoResult<Vec<ServiceProvider>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM service_providers");
        if let Some(status) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<ServiceProvider>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// list_available_providers
    ///
    /// Validated providers that are `ready` or `emergency_ready`. The service filter is
    /// case-insensitive against the provider's `services` array.
    async fn list_available_providers(
        &self,
        filter: &AvailabilityFilter,
    ) -> RepoResult<Vec<ServiceProvider>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT * FROM service_providers
               WHERE status = 'validated' AND state IN ('ready', 'emergency_ready')"#,
        );
        if let Some(service) = &filter.service {
            builder.push(" AND EXISTS (SELECT 1 FROM unnest(services) s WHERE lower(s) = lower(");
            builder.push_bind(service.clone());
            builder.push("))");
        }
        if let Some(wilaya) = &filter.wilaya {
            builder.push(" AND wilaya = ");
            builder.push_bind(wilaya.clone());
        }
        builder.push(" ORDER BY rating DESC NULLS LAST, created_at");

        Ok(builder
            .build_query_as::<ServiceProvider>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_emergency_ready(&self) -> RepoResult<Vec<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            r#"SELECT * FROM service_providers
               WHERE status = 'validated' AND state = 'emergency_ready'
                 AND latitude IS NOT NULL AND longitude IS NOT NULL
               ORDER BY created_at"#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        Ok(
            sqlx::query_as::<_, ServiceProvider>("SELECT * FROM service_providers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn phone_registered(&self, phone: &str) -> RepoResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM service_providers WHERE phone = $1)",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn create_service_provider(
        &self,
        sp: NewServiceProvider,
    ) -> RepoResult<ServiceProvider> {
        sqlx::query_as::<_, ServiceProvider>(
            r#"INSERT INTO service_providers (
                   id, phone, firstname, lastname, gender, birthdate, wilaya, commune,
                   job_title, description, email, rating, latitude, longitude, services,
                   picture, birth_certificate, residence_certificate, id_card, criminal_record,
                   diplomas)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18, $19, $20, $21)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(sp.phone)
        .bind(sp.firstname)
        .bind(sp.lastname)
        .bind(sp.gender)
        .bind(sp.birthdate)
        .bind(sp.wilaya)
        .bind(sp.commune)
        .bind(sp.job_title)
        .bind(sp.description)
        .bind(sp.email.to_lowercase())
        .bind(sp.rating)
        .bind(sp.latitude)
        .bind(sp.longitude)
        .bind(sp.services)
        .bind(sp.picture)
        .bind(sp.birth_certificate)
        .bind(sp.residence_certificate)
        .bind(sp.id_card)
        .bind(sp.criminal_record)
        .bind(Json(sp.diplomas))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                &[
                    ("service_providers_phone_key", "This phone number is already registered."),
                    ("service_providers_email_key", "This email is already registered."),
                ],
                "This service provider is already registered.",
            )
        })
    }

    async fn validate_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            r#"UPDATE service_providers SET status = 'validated', updated_at = now()
               WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn ban_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            r#"UPDATE service_providers
               SET status = 'banned', state = 'not_ready', updated_at = now()
               WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_provider_state(
        &self,
        id: Uuid,
        state: SpState,
    ) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            "UPDATE service_providers SET state = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(state)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_provider_services(
        &self,
        id: Uuid,
        services: Vec<String>,
    ) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            "UPDATE service_providers SET services = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(services)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_provider_picture(
        &self,
        id: Uuid,
        picture: String,
    ) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            "UPDATE service_providers SET picture = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(picture)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_percent_to_pay(
        &self,
        id: Uuid,
        percent: f64,
    ) -> RepoResult<Option<ServiceProvider>> {
        Ok(sqlx::query_as::<_, ServiceProvider>(
            r#"UPDATE service_providers SET percent_to_pay = $2, updated_at = now()
               WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(percent)
        .fetch_optional(&self.pool)
        .await?)
    }

    // --- PAYMENTS & INTERVENTIONS ---

    async fn list_payments(&self, provider_id: Uuid) -> RepoResult<Vec<Payment>> {
        Ok(sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE service_provider_id = $1 ORDER BY date DESC",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_payment(
        &self,
        provider_id: Uuid,
        amount: f64,
        date: DateTime<Utc>,
    ) -> RepoResult<Option<Payment>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"UPDATE service_providers
               SET amount_to_pay = GREATEST(amount_to_pay - $2, 0), updated_at = now()
               WHERE id = $1"#,
        )
        .bind(provider_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"INSERT INTO payments (id, service_provider_id, amount, date)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(provider_id)
        .bind(amount)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(payment))
    }

    async fn list_interventions(&self, provider_id: Uuid) -> RepoResult<Vec<Intervention>> {
        Ok(sqlx::query_as::<_, Intervention>(
            "SELECT * FROM interventions WHERE service_provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // --- COMMANDS ---

    async fn list_commands(&self, scope: CommandScope) -> RepoResult<Vec<Command>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM commands");
        match scope {
            CommandScope::All => {}
            CommandScope::Client(id) => {
                builder.push(" WHERE client_id = ");
                builder.push_bind(id);
            }
            CommandScope::Provider(id) => {
                builder.push(" WHERE service_provider_id = ");
                builder.push_bind(id);
            }
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Command>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_command(&self, id: Uuid) -> RepoResult<Option<Command>> {
        Ok(sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_command(&self, command: NewCommand) -> RepoResult<Command> {
        Ok(sqlx::query_as::<_, Command>(
            r#"INSERT INTO commands (
                   id, client_id, service_provider_id, service_type_id, kind, description,
                   address, price, promo_code, discount, total)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(command.client_id)
        .bind(command.service_provider_id)
        .bind(command.service_type_id)
        .bind(command.kind)
        .bind(command.description)
        .bind(command.address)
        .bind(command.price)
        .bind(command.promo_code)
        .bind(command.discount)
        .bind(command.total)
        .fetch_one(&self.pool)
        .await?)
    }

    /// update_command_status
    ///
    /// Runs in one transaction with the command row locked, so two concurrent
    /// completions cannot both credit the provider.
    async fn update_command_status(
        &self,
        id: Uuid,
        next: CommandStatus,
    ) -> RepoResult<Option<Command>> {
        let mut tx = self.pool.begin().await?;

        let Some(current) =
            sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };
        if !current.status.can_transition_to(next) {
            return Err(transition_conflict(current.status, next));
        }

        let updated = sqlx::query_as::<_, Command>(
            "UPDATE commands SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        if next == CommandStatus::Completed {
            let percent = sqlx::query_scalar::<_, f64>(
                "SELECT percent_to_pay FROM service_providers WHERE id = $1 FOR UPDATE",
            )
            .bind(updated.service_provider_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound("service provider"))?;

            sqlx::query(
                r#"INSERT INTO interventions (id, service_provider_id, command_id, amount)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(Uuid::new_v4())
            .bind(updated.service_provider_id)
            .bind(updated.id)
            .bind(updated.total)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"UPDATE service_providers
                   SET balance = balance + $2, amount_to_pay = amount_to_pay + $3,
                       updated_at = now()
                   WHERE id = $1"#,
            )
            .bind(updated.service_provider_id)
            .bind(updated.total)
            .bind(commission(updated.total, percent))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(command_id = %id, status = ?next, "command status changed");
        Ok(Some(updated))
    }

    async fn delete_command(&self, id: Uuid) -> RepoResult<Option<Command>> {
        Ok(
            sqlx::query_as::<_, Command>("DELETE FROM commands WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
