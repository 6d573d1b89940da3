use super::session::Session;

/// One-shot messages stored in the session until read
#[derive(Debug, Clone)]
pub struct Flash {
    session: Session,
}

impl Flash {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn push(&self, kind: &str, message: impl AsRef<str>) {
        self.session.push_flash(kind, message.as_ref());
    }

    /// Read and clear messages of `kind`
    pub fn take(&self, kind: &str) -> Vec<String> {
        self.session.take_flash(kind)
    }

    /// First message of `kind`, clearing the rest
    pub fn take_one(&self, kind: &str) -> Option<String> {
        self.take(kind).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_one() {
        let flash = Flash::new(Session::new());
        flash.push("error", "first");
        flash.push("error", "second");

        assert_eq!(flash.take_one("error").as_deref(), Some("first"));
        assert!(flash.take_one("error").is_none());
    }

    #[test]
    fn test_kinds_are_separate() {
        let session = Session::new();
        let flash = Flash::new(session.clone());
        flash.push("error", "bad");
        flash.push("info", "ok");

        assert_eq!(flash.take("info"), vec!["ok"]);
        assert_eq!(session.take_flash("error"), vec!["bad"]);
    }
}
