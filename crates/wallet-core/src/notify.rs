// ── Transient user notifications ──
//
// Mutation outcomes are announced as short pt-BR messages on a
// broadcast channel; front ends decide how to show them.

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::CoreError;

const NOTIFICATION_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Fan-out point for notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Level::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Level::Error, message.into());
    }

    /// Announce the outcome of a mutation and pass the result through.
    ///
    /// Failures show the server's message when it sent one, else
    /// `failure`.
    pub fn outcome<T>(
        &self,
        result: Result<T, CoreError>,
        success: &str,
        failure: &str,
    ) -> Result<T, CoreError> {
        match &result {
            Ok(_) => self.success(success),
            Err(CoreError::Cancelled) => {}
            Err(e) => self.error(e.user_message(failure)),
        }
        result
    }

    fn publish(&self, level: Level, message: String) {
        debug!(%level, %message, "notification");
        // Nobody listening is fine.
        let _ = self.tx.send(Notification { level, message });
    }
}

/// pt-BR notification texts.
pub mod messages {
    pub const LOGIN_OK: &str = "Login realizado com sucesso!";
    pub const LOGIN_FAILED: &str = "Erro ao fazer login";
    pub const REGISTER_OK: &str = "Cadastro realizado com sucesso!";
    pub const REGISTER_FAILED: &str = "Erro ao criar conta";

    pub const TRANSACTION_CREATED: &str = "Transação criada com sucesso!";
    pub const TRANSACTION_CREATE_FAILED: &str = "Erro ao criar transação";
    pub const TRANSACTION_UPDATED: &str = "Transação atualizada com sucesso!";
    pub const TRANSACTION_UPDATE_FAILED: &str = "Erro ao atualizar transação";
    pub const TRANSACTION_DELETED: &str = "Transação deletada com sucesso!";
    pub const TRANSACTION_DELETE_FAILED: &str = "Erro ao deletar transação";

    pub const CATEGORY_CREATED: &str = "Categoria criada com sucesso!";
    pub const CATEGORY_CREATE_FAILED: &str = "Erro ao criar categoria";
    pub const CATEGORY_UPDATED: &str = "Categoria atualizada com sucesso!";
    pub const CATEGORY_UPDATE_FAILED: &str = "Erro ao atualizar categoria";
    pub const CATEGORY_DELETED: &str = "Categoria deletada com sucesso!";
    pub const CATEGORY_DELETE_FAILED: &str = "Erro ao deletar categoria";
    pub const CATEGORY_ACTIVATED: &str = "Categoria ativada!";
    pub const CATEGORY_ACTIVATE_FAILED: &str = "Erro ao ativar categoria";
    pub const CATEGORY_DEACTIVATED: &str = "Categoria desativada!";
    pub const CATEGORY_DEACTIVATE_FAILED: &str = "Erro ao desativar categoria";
    pub const CATEGORIES_REORDERED: &str = "Ordem das categorias atualizada!";
    pub const CATEGORIES_REORDER_FAILED: &str = "Erro ao reordenar categorias";

    pub const PROFILE_UPDATED: &str = "Perfil atualizado com sucesso!";
    pub const PROFILE_UPDATE_FAILED: &str = "Erro ao atualizar perfil";
    pub const PASSWORD_UPDATED: &str = "Senha atualizada com sucesso!";
    pub const PASSWORD_UPDATE_FAILED: &str = "Erro ao atualizar senha";
    pub const ACCOUNT_DELETED: &str = "Conta excluída com sucesso!";
    pub const ACCOUNT_DELETE_FAILED: &str = "Erro ao excluir conta";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefers_server_message() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        let _ = notifier.outcome::<()>(
            Err(CoreError::Conflict {
                message: "Categoria já existe".into(),
            }),
            messages::CATEGORY_CREATED,
            messages::CATEGORY_CREATE_FAILED,
        );
        let _ = notifier.outcome::<()>(
            Err(CoreError::Timeout),
            messages::CATEGORY_CREATED,
            messages::CATEGORY_CREATE_FAILED,
        );

        assert_eq!(rx.try_recv().unwrap().message, "Categoria já existe");
        let fallback = rx.try_recv().unwrap();
        assert_eq!(fallback.level, Level::Error);
        assert_eq!(fallback.message, "Erro ao criar categoria");
    }

    #[test]
    fn success_is_announced() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        let value = notifier
            .outcome(Ok(5), messages::TRANSACTION_CREATED, messages::TRANSACTION_CREATE_FAILED)
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification {
                level: Level::Success,
                message: "Transação criada com sucesso!".into()
            }
        );
    }
}
