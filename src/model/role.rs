#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Manager = 1,
    Employee = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Manager),
            2 => Some(Role::Employee),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_role_ids_resolve() {
        assert_eq!(Role::from_id(1), Some(Role::Manager));
        assert_eq!(Role::from_id(2), Some(Role::Employee));
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(3), None);
    }
}
