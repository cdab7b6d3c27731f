//! API エンドポイントのパス

pub mod api_key {
    pub fn info() -> &'static str {
        "v1/api-key/info"
    }
}

pub mod project {
    pub fn create() -> &'static str {
        "v1/project/create"
    }

    pub fn by_owner(owner_name: &str, project_name: &str) -> String {
        format!("v1/project/{}/{}", owner_name, project_name)
    }

    pub fn by_id(id: i64) -> String {
        format!("v1/project/{}", id)
    }
}

pub mod export {
    pub fn project() -> &'static str {
        "v1/export/project"
    }
}

pub mod source {
    pub fn by_path(owner_name: &str, project_name: &str, directory: &str, name: &str) -> String {
        format!("v1/source/{}/{}/{}/{}", owner_name, project_name, directory, name)
    }

    pub fn annotations(owner_name: &str, project_name: &str, directory: &str, name: &str) -> String {
        format!("{}/annotations", by_path(owner_name, project_name, directory, name))
    }

    pub fn create_text() -> &'static str {
        "v1/source/create-text"
    }

    pub fn init_pdf() -> &'static str {
        "v1/source/init-pdf"
    }

    pub fn create_pdf() -> &'static str {
        "v1/source/create-pdf"
    }
}

pub mod annotation {
    pub fn bulk_create() -> &'static str {
        "v1/annotation/bulk-create"
    }
}

pub mod relation {
    pub fn bulk_create() -> &'static str {
        "v1/relation/bulk-create"
    }
}

pub mod schema {
    pub fn create() -> &'static str {
        "v1/schema/create"
    }
}

pub mod annotation_type {
    pub fn create() -> &'static str {
        "v1/annotation-type/create"
    }
}

pub mod layer {
    pub fn create() -> &'static str {
        "v1/layer/create"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_paths() {
        assert_eq!(
            source::by_path("acme", "contracts", "Uploads", "a.pdf"),
            "v1/source/acme/contracts/Uploads/a.pdf"
        );
        assert_eq!(
            source::annotations("acme", "contracts", "Uploads", "a.pdf"),
            "v1/source/acme/contracts/Uploads/a.pdf/annotations"
        );
    }

    #[test]
    fn test_project_paths() {
        assert_eq!(project::by_owner("acme", "contracts"), "v1/project/acme/contracts");
        assert_eq!(project::by_id(42), "v1/project/42");
    }
}
