use uuid::Uuid;

/// Canonical text form used when comparing UUIDs: lowercase, without dashes.
pub trait UuidExt {
    fn normalized(&self) -> String;
}

impl UuidExt for Uuid {
    fn normalized(&self) -> String {
        self.simple().to_string()
    }
}

impl UuidExt for str {
    fn normalized(&self) -> String {
        self.chars()
            .filter(|&c| c != '-')
            .flat_map(char::to_lowercase)
            .collect()
    }
}
