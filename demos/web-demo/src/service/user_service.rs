use bizkit_web::ServiceError;
use parking_lot::RwLock;

use crate::models::{CreateUserRequest, SearchQuery, User};

/// 单个账号最多能创建的用户数
const USER_QUOTA: usize = 10;

/// 业务错误码：配额用尽
pub const QUOTA_EXCEEDED: i64 = 1001;

/// 内存中的用户存储
pub struct UserService {
    users: RwLock<Vec<User>>,
}

impl UserService {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(vec![
                User {
                    id: 1,
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                },
                User {
                    id: 2,
                    name: "Bob".to_string(),
                    email: "bob@example.com".to_string(),
                },
            ]),
        }
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<User> {
        let page = query.page.unwrap_or(1).max(1) as usize;
        let size = query.size.unwrap_or(20).clamp(1, 100) as usize;

        self.users
            .read()
            .iter()
            .filter(|u| match &query.name {
                Some(name) => u.name.to_lowercase().contains(&name.to_lowercase()),
                None => true,
            })
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u32) -> Result<User, ServiceError> {
        self.users
            .read()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("User {} does not exist.", id)))
    }

    pub fn create(&self, request: CreateUserRequest) -> Result<User, ServiceError> {
        if !request.email.contains('@') {
            return Err(ServiceError::invalid_argument("Email address is malformed."));
        }

        let mut users = self.users.write();
        if users.len() >= USER_QUOTA {
            return Err(ServiceError::with_code(QUOTA_EXCEEDED, "quota exceeded"));
        }

        let user = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            name: request.name,
            email: request.email,
        };
        users.push(user.clone());

        tracing::info!(id = user.id, "User created");
        Ok(user)
    }

    pub fn delete(&self, id: u32) -> Result<(), ServiceError> {
        let mut users = self.users.write();
        let before = users.len();
        users.retain(|u| u.id != id);

        if users.len() == before {
            return Err(ServiceError::not_found(""));
        }
        Ok(())
    }
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}
