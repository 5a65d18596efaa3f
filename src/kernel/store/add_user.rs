use {
    super::{
        Store,
        StoreError,
    },
    crate::auction::entities::User,
};

impl Store {
    pub async fn add_user(&self, user: User) -> Result<(), StoreError> {
        if user.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        if user.email.trim().is_empty() {
            return Err(StoreError::Validation("email must not be empty".to_string()));
        }
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        users.insert(user.id, user);
        Ok(())
    }
}
