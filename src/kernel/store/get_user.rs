use {
    super::Store,
    crate::{
        auction::entities::User,
        kernel::entities::UserId,
    },
};

impl Store {
    pub async fn get_user(&self, user_id: UserId) -> Option<User> {
        self.users.read().await.get(&user_id).cloned()
    }
}
