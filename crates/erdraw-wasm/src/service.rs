//! Diagram server replies fetched by the host.
//!
//! `fetch` is asynchronous in the browser while [`DiagramService`] is not, so
//! the host performs the request itself and stages the raw reply here before
//! asking the session to consume it.

use erdraw_core::{DiagramData, LayoutDocument};
use erdraw_editor::{DiagramPayload, DiagramService, RemoteError};

#[derive(Debug, Default)]
pub struct StagedService {
    reply: Option<Result<String, RemoteError>>,
}

impl StagedService {
    /// Stage an HTTP reply. Status `0` means the request never completed.
    pub fn stage(&mut self, status: u16, body: String) {
        self.reply = Some(match status {
            0 => Err(RemoteError::Network(body)),
            200..=299 => Ok(body),
            _ => Err(RemoteError::Status {
                status,
                message: body,
            }),
        });
    }

    fn take(&mut self) -> Result<String, RemoteError> {
        self.reply
            .take()
            .unwrap_or_else(|| Err(RemoteError::Network("no reply staged".into())))
    }
}

impl DiagramService for StagedService {
    fn fetch_diagram(&mut self) -> Result<DiagramPayload, RemoteError> {
        Ok(serde_json::from_str(&self.take()?)?)
    }

    fn fetch_table_ddl(&mut self, _table: &str) -> Result<String, RemoteError> {
        self.take()
    }

    fn save_layout(&mut self, _layout: &LayoutDocument) -> Result<(), RemoteError> {
        self.take().map(drop)
    }

    fn reverse_engineer(&mut self) -> Result<DiagramData, RemoteError> {
        let payload: DiagramPayload = serde_json::from_str(&self.take()?)?;
        Ok(payload.diagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replies_are_consumed_once() {
        let mut service = StagedService::default();
        service.stage(200, "CREATE TABLE t ()".into());
        assert_eq!(service.fetch_table_ddl("t").unwrap(), "CREATE TABLE t ()");
        assert!(matches!(
            service.fetch_table_ddl("t"),
            Err(RemoteError::Network(_))
        ));
    }

    #[test]
    fn status_codes_map_to_errors() {
        let mut service = StagedService::default();
        service.stage(404, "missing".into());
        let err = service.fetch_diagram().unwrap_err();
        assert_eq!(err.to_string(), "server responded 404: missing");

        service.stage(0, "offline".into());
        let err = service.save_layout(&LayoutDocument::new()).unwrap_err();
        assert_eq!(err.to_string(), "network error: offline");

        service.stage(200, "not json".into());
        assert!(matches!(
            service.reverse_engineer(),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn diagram_reply_decodes() {
        let mut service = StagedService::default();
        service.stage(
            200,
            r#"{"diagram":{"tables":[{"name":"users"}],"relationships":[]}}"#.into(),
        );
        let payload = service.fetch_diagram().unwrap();
        assert_eq!(payload.diagram.entities[0].name, "users");
    }
}
