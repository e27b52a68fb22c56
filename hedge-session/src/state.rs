use hedge_engine::{ConfigDraft, HedgeError};
use hedge_types::{Address, ProtectionLimits, UserConfiguration};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    History,
}

/// Session state. Transitions borrow the current value and return the next
/// one; callers swap the whole value in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Session {
    #[default]
    Disconnected,
    Connected {
        address: Address,
    },
    Configuring {
        address: Address,
        draft: ConfigDraft,
    },
    Active {
        address: Address,
        config: UserConfiguration,
        view: View,
    },
}

impl Session {
    pub fn name(&self) -> &'static str {
        match self {
            Session::Disconnected => "disconnected",
            Session::Connected { .. } => "connected",
            Session::Configuring { .. } => "configuring",
            Session::Active { .. } => "active",
        }
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            Session::Disconnected => None,
            Session::Connected { address }
            | Session::Configuring { address, .. }
            | Session::Active { address, .. } => Some(address),
        }
    }

    pub fn config(&self) -> Option<&UserConfiguration> {
        match self {
            Session::Active { config, .. } => Some(config),
            _ => None,
        }
    }

    fn reject(&self, action: &'static str) -> HedgeError {
        HedgeError::InvalidTransition { from: self.name(), action }
    }

    pub fn connect(&self, address: Address) -> Result<Session, HedgeError> {
        match self {
            Session::Disconnected => Ok(Session::Connected { address }),
            _ => Err(self.reject("connect")),
        }
    }

    /// Open the setup form: fresh defaults after connecting, or the current
    /// configuration when coming back from the dashboard.
    pub fn begin_setup(&self, limits: &ProtectionLimits) -> Result<Session, HedgeError> {
        match self {
            Session::Connected { address } => Ok(Session::Configuring {
                address: address.clone(),
                draft: ConfigDraft::with_defaults(limits),
            }),
            Session::Active { address, config, .. } => Ok(Session::Configuring {
                address: address.clone(),
                draft: ConfigDraft::from_config(config),
            }),
            _ => Err(self.reject("open setup")),
        }
    }

    pub fn edit(&self, draft: ConfigDraft) -> Result<Session, HedgeError> {
        match self {
            Session::Configuring { address, .. } => Ok(Session::Configuring {
                address: address.clone(),
                draft,
            }),
            _ => Err(self.reject("edit the configuration")),
        }
    }

    /// Enter the dashboard with a configuration the contract has accepted.
    pub fn activate(&self, config: UserConfiguration) -> Result<Session, HedgeError> {
        match self {
            Session::Connected { address } | Session::Configuring { address, .. } => Ok(Session::Active {
                address: address.clone(),
                config,
                view: View::Dashboard,
            }),
            _ => Err(self.reject("activate protection")),
        }
    }

    pub fn show(&self, view: View) -> Result<Session, HedgeError> {
        match self {
            Session::Active { address, config, .. } => Ok(Session::Active {
                address: address.clone(),
                config: config.clone(),
                view,
            }),
            _ => Err(self.reject("change view")),
        }
    }

    pub fn disconnect(&self) -> Session {
        Session::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_types::CurrencyCode;
    use rust_decimal_macros::dec;

    fn addr() -> Address {
        Address::new("GDNDD6KLDSDL3A5BGG2CIQ56E5GBVXMJCFAKBZ7J3INF4N4ETVDFUKJT")
    }

    fn config() -> UserConfiguration {
        UserConfiguration {
            currency: CurrencyCode::new("ARS"),
            target_percentage: 25,
            threshold: dec!(2.0),
        }
    }

    #[test]
    fn happy_path() {
        let limits = ProtectionLimits::default();
        let s = Session::default().connect(addr()).unwrap();
        assert_eq!(s.name(), "connected");

        let s = s.begin_setup(&limits).unwrap();
        match &s {
            Session::Configuring { draft, .. } => {
                assert!(draft.currency.is_none());
                assert_eq!(draft.percentage, Some(25));
            }
            other => panic!("unexpected {:?}", other),
        }

        let s = s.activate(config()).unwrap();
        assert_eq!(s.config(), Some(&config()));

        let s = s.show(View::History).unwrap();
        assert!(matches!(s, Session::Active { view: View::History, .. }));

        let back = s.begin_setup(&limits).unwrap();
        match back {
            Session::Configuring { draft, .. } => assert_eq!(draft, ConfigDraft::from_config(&config())),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let limits = ProtectionLimits::default();
        let err = Session::Disconnected.begin_setup(&limits).unwrap_err();
        assert_eq!(
            err,
            HedgeError::InvalidTransition { from: "disconnected", action: "open setup" }
        );

        let connected = Session::Disconnected.connect(addr()).unwrap();
        assert!(connected.connect(addr()).is_err());
        assert!(connected.show(View::History).is_err());
        assert!(connected.edit(ConfigDraft::default()).is_err());
        assert!(Session::Disconnected.activate(config()).is_err());
    }

    #[test]
    fn transitions_leave_source_untouched() {
        let connected = Session::Disconnected.connect(addr()).unwrap();
        let _ = connected.activate(config()).unwrap();
        assert_eq!(connected.name(), "connected");
        assert_eq!(connected.address(), Some(&addr()));
        assert_eq!(connected.disconnect(), Session::Disconnected);
    }
}
