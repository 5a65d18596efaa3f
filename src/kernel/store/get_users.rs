use {
    super::Store,
    crate::auction::entities::User,
};

impl Store {
    pub async fn get_users(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }
}
