use crate::error::DriveError;

/// Resolve a Drive folder id from any of the accepted URL shapes, or a raw id
/// passed through unchanged:
///   - `.../folders/<id>[?...]`
///   - `.../open?id=<id>[&...]`
///   - `.../d/<id>/...`
///   - a bare id (no `/` or `?` characters)
pub fn parse_folder_id(url: &str) -> Result<String, DriveError> {
    let trimmed = url.trim();

    if let Some(idx) = trimmed.find("/folders/") {
        let rest = &trimmed[idx + "/folders/".len()..];
        let id = rest.split(['?', '/', '#']).next().unwrap_or("");
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    if let Some(idx) = trimmed.find("open?") {
        let query = &trimmed[idx + "open?".len()..];
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("id=") {
                let id = id.split('&').next().unwrap_or("");
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
    }

    if let Some(idx) = trimmed.find("/d/") {
        let rest = &trimmed[idx + "/d/".len()..];
        let id = rest.split(['?', '/', '#']).next().unwrap_or("");
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    if !trimmed.is_empty() && !trimmed.contains('/') && !trimmed.contains('?') {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::UnresolvableFolderUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_folders_path_form() {
        let id = parse_folder_id("https://drive.google.com/drive/folders/1AbCdEf?usp=sharing").unwrap();
        assert_eq!(id, "1AbCdEf");
    }

    #[test]
    fn parses_open_query_form() {
        let id = parse_folder_id("https://drive.google.com/open?id=1AbCdEf&authuser=0").unwrap();
        assert_eq!(id, "1AbCdEf");
    }

    #[test]
    fn parses_d_slash_form() {
        let id = parse_folder_id("https://drive.google.com/d/1AbCdEf/view").unwrap();
        assert_eq!(id, "1AbCdEf");
    }

    #[test]
    fn accepts_raw_id() {
        let id = parse_folder_id("1AbCdEf").unwrap();
        assert_eq!(id, "1AbCdEf");
    }

    #[test]
    fn rejects_unresolvable_url() {
        assert!(parse_folder_id("https://example.com/not-a-drive-link").is_err());
    }
}
