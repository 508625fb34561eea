use crate::{
    Service,
    error::{Result, ServiceError},
    outbox::Mail,
    token::TokenPurpose,
};
use socium_common::{
    geo::Coordinates,
    model::{
        Id, ModelValidationError,
        account::{Account, AccountMarker, CreateAccount, Credentials, EmailAddress, Role},
        auth::{AccessToken, HashedPassword, Password},
    },
    util::timestamp_now,
};
use socium_db::Gateway;
use tracing::{debug, info, warn};

impl<G: Gateway> Service<G> {
    /// Stores a new, not yet activated account and queues its activation mail.
    pub async fn register(&self, create: CreateAccount) -> Result<Account> {
        if self
            .gateway
            .fetch_account_by_email(&create.email)
            .await?
            .is_some()
        {
            return Err(ServiceError::AccountAlreadyRegistered(create.email));
        }

        let location = Coordinates::from_parts(create.latitude, create.longitude)
            .map_err(ModelValidationError::from)?;
        let password_hash = HashedPassword::hash(&create.password)?;
        let now = timestamp_now();

        let account = Account {
            id: self.next_id()?,
            name: create.name,
            surname: create.surname,
            email: create.email,
            password_hash,
            role: Role::User,
            is_activated: false,
            description: String::new(),
            profile_image: String::new(),
            location,
            friend_request_ids: Vec::new(),
            friend_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let activation = self.tokens.sign_for(&account, TokenPurpose::Activation)?;

        self.gateway.insert_account(&account).await?;
        info!(account = %account.id, "Registered account");

        self.send_mail(Mail {
            to: account.email.clone(),
            subject: "Activate your socium account".to_owned(),
            body: format!(
                "Hello {}, activate your account here: {}/api/activation/{}",
                account.name,
                self.public_url,
                activation.as_str()
            ),
        });

        Ok(account)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AccessToken> {
        let account = self
            .gateway
            .fetch_account_by_email(&credentials.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !account.is_activated {
            return Err(ServiceError::AccountNotActivated(account.id));
        }

        if !account.password_hash.verify(&credentials.password) {
            debug!(account = %account.id, "Rejected login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        self.tokens.sign(&account)
    }

    /// Activates the account named by a mailed activation token.
    pub async fn activate(&self, token: &str) -> Result<Account> {
        let id = self.tokens.verify_for(token, TokenPurpose::Activation)?.sub;
        let mut account = self.fetch_account(id).await?;

        if account.is_activated {
            return Err(ServiceError::AccountAlreadyActivated(id));
        }

        account.is_activated = true;
        account.updated_at = timestamp_now();

        let account = self.replace_account(&account).await?;
        info!(account = %id, "Activated account");
        Ok(account)
    }

    /// Queues a mail with a short-lived password reset link.
    pub async fn forgot_password(&self, email: &EmailAddress) -> Result<()> {
        let account = self
            .gateway
            .fetch_account_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::EmailNotFound(email.clone()))?;

        if !account.is_activated {
            return Err(ServiceError::AccountNotActivated(account.id));
        }

        let reset = self.tokens.sign_for(&account, TokenPurpose::PasswordReset)?;
        self.send_mail(Mail {
            to: account.email,
            subject: "Reset your socium password".to_owned(),
            body: format!(
                "Hello {}, choose a new password here: {}/reset-password/{}",
                account.name,
                self.public_url,
                reset.as_str()
            ),
        });

        Ok(())
    }

    /// Sets a new password for the account named by a mailed reset token.
    ///
    /// A token issued before the account last changed is refused, so a
    /// link stops working once it has been used.
    pub async fn reset_password(&self, token: &str, password: &Password) -> Result<Account> {
        let claims = self.tokens.verify_for(token, TokenPurpose::PasswordReset)?;
        let id = claims.sub;
        let mut account = self.fetch_account(id).await?;

        if account.updated_at.unix_timestamp() > claims.iat {
            return Err(ServiceError::StaleToken(id));
        }

        account.password_hash = HashedPassword::hash(password)?;
        account.updated_at = timestamp_now();

        let account = self.replace_account(&account).await?;
        info!(account = %id, "Reset password");
        Ok(account)
    }

    /// Makes sure an activated admin account exists for `email`, creating or
    /// promoting it. The password of an existing account is left alone.
    pub async fn ensure_admin(
        &self,
        name: &str,
        surname: &str,
        email: EmailAddress,
        password: &Password,
    ) -> Result<Account> {
        if let Some(mut account) = self.gateway.fetch_account_by_email(&email).await? {
            if account.is_admin() && account.is_activated {
                debug!(account = %account.id, "Admin account already present");
                return Ok(account);
            }

            account.role = Role::Admin;
            account.is_activated = true;
            account.updated_at = timestamp_now();

            let account = self.replace_account(&account).await?;
            info!(account = %account.id, "Promoted account to admin");
            return Ok(account);
        }

        let now = timestamp_now();
        let account = Account {
            id: self.next_id()?,
            name: name.to_owned(),
            surname: surname.to_owned(),
            email,
            password_hash: HashedPassword::hash(password)?,
            role: Role::Admin,
            is_activated: true,
            description: String::new(),
            profile_image: String::new(),
            location: None,
            friend_request_ids: Vec::new(),
            friend_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.gateway.insert_account(&account).await?;
        info!(account = %account.id, "Created admin account");
        Ok(account)
    }

    pub(crate) async fn fetch_account(&self, id: Id<AccountMarker>) -> Result<Account> {
        self.gateway
            .fetch_account(id)
            .await?
            .ok_or(ServiceError::AccountNotFound(id))
    }

    /// Whole-record replace that treats a vanished record as not found.
    pub(crate) async fn replace_account(&self, account: &Account) -> Result<Account> {
        self.gateway
            .replace_account(account)
            .await?
            .ok_or(ServiceError::AccountNotFound(account.id))
    }

    fn send_mail(&self, mail: Mail) {
        if let Err(error) = self.outbox.enqueue(mail) {
            warn!(%error, "Mail was not queued");
        }
    }
}
