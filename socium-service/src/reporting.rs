use crate::{
    Service,
    error::{Result, ServiceError},
};
use socium_common::model::{
    Id,
    contact::{ContactMarker, ContactMessage, CreateContact},
    dashboard::DashboardSummary,
};
use socium_db::{AccountFilter, Gateway};
use tracing::info;

impl<G: Gateway> Service<G> {
    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let activated = AccountFilter {
            activated: Some(true),
            ..AccountFilter::default()
        };

        Ok(DashboardSummary {
            user_count: self.gateway.count_accounts(&AccountFilter::default()).await?,
            post_count: self.gateway.count_posts().await?,
            comment_count: self.gateway.count_comments().await?,
            activated_user_count: self.gateway.count_accounts(&activated).await?,
        })
    }

    pub async fn create_contact(&self, create: CreateContact) -> Result<ContactMessage> {
        let contact = ContactMessage {
            id: self.next_id()?,
            name: create.name,
            surname: create.surname,
            email: create.email,
            message: create.message,
        };

        self.gateway.insert_contact(&contact).await?;
        info!(contact = %contact.id, "Received contact message");
        Ok(contact)
    }

    pub async fn list_contacts(&self) -> Result<Vec<ContactMessage>> {
        Ok(self.gateway.fetch_contacts().await?)
    }

    pub async fn delete_contact(&self, id: Id<ContactMarker>) -> Result<()> {
        if !self.gateway.delete_contact(id).await? {
            return Err(ServiceError::ContactNotFound(id));
        }

        info!(contact = %id, "Deleted contact message");
        Ok(())
    }
}
