//! Keplr-compatible wallet extension (`window.keplr`).
//!
//! No JS handles are stored: every call looks the extension up again, so the
//! provider and signer stay plain Rust values.

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use std::sync::Arc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{CustomEvent, CustomEventInit};
use yn_api_types::{ChainId, WalletAddress};
use yn_wallet::{
    AccountData, OfflineSigner, PROVIDER_MISSING_MESSAGE, WalletConnector, WalletError, WalletNotifier,
    WalletProvider,
};

use crate::dom;

/// Window event fired after a successful connect, with `{address}` as detail.
pub const WALLET_CONNECTED_EVENT: &str = "keplr-wallet-connected";

fn provider_error(value: JsValue) -> WalletError {
    WalletError::Provider(dom::describe(&value))
}

fn keplr() -> Result<JsValue, WalletError> {
    let window = dom::window().map_err(WalletError::Provider)?;
    let keplr = Reflect::get(&window, &JsValue::from_str("keplr")).map_err(provider_error)?;
    if keplr.is_undefined() || keplr.is_null() {
        return Err(WalletError::ProviderUnavailable);
    }
    Ok(keplr)
}

pub fn is_installed() -> bool {
    keplr().is_ok()
}

fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, WalletError> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))
        .map_err(provider_error)?
        .dyn_into()
        .map_err(|_| WalletError::Provider(format!("`{name}` is not a function")))?;
    let args: Array = args.iter().collect();
    method.apply(target, &args).map_err(provider_error)
}

/// Awaits `value` whether or not it is a promise.
async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    JsFuture::from(Promise::resolve(&value)).await
}

fn field_string(object: &JsValue, name: &str) -> Option<String> {
    Reflect::get(object, &JsValue::from_str(name)).ok()?.as_string()
}

pub struct KeplrProvider;

#[async_trait(?Send)]
impl WalletProvider for KeplrProvider {
    async fn enable(&self, chain_id: &ChainId) -> Result<(), WalletError> {
        let pending = call(&keplr()?, "enable", &[JsValue::from_str(chain_id.as_str())])?;
        settle(pending).await.map_err(|err| {
            gloo_console::warn!(format!("keplr.enable rejected: {}", dom::describe(&err)));
            WalletError::PermissionDenied {
                chain_id: chain_id.0.clone(),
            }
        })?;
        Ok(())
    }

    fn offline_signer(&self, chain_id: &ChainId) -> Result<Arc<dyn OfflineSigner>, WalletError> {
        keplr()?;
        Ok(Arc::new(KeplrSigner {
            chain_id: chain_id.clone(),
        }))
    }
}

pub struct KeplrSigner {
    chain_id: ChainId,
}

#[async_trait(?Send)]
impl OfflineSigner for KeplrSigner {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, WalletError> {
        let signer = call(
            &keplr()?,
            "getOfflineSigner",
            &[JsValue::from_str(self.chain_id.as_str())],
        )?;
        let accounts = settle(call(&signer, "getAccounts", &[])?)
            .await
            .map_err(provider_error)?;
        let accounts: Array = accounts
            .dyn_into()
            .map_err(|_| WalletError::Provider("getAccounts did not return an array".to_owned()))?;

        Ok(accounts
            .iter()
            .filter_map(|account| {
                let address = field_string(&account, "address")?;
                let pubkey = Reflect::get(&account, &JsValue::from_str("pubkey"))
                    .ok()
                    .and_then(|key| key.dyn_into::<Uint8Array>().ok())
                    .map(|key| key.to_vec())
                    .unwrap_or_default();
                Some(AccountData {
                    address: WalletAddress(address),
                    algo: field_string(&account, "algo").unwrap_or_default(),
                    pubkey,
                })
            })
            .collect())
    }
}

/// Surfaces connection problems with `window.alert`.
pub struct AlertNotifier;

impl WalletNotifier for AlertNotifier {
    fn provider_missing(&self) {
        gloo_console::warn!(PROVIDER_MISSING_MESSAGE);
        if let Ok(window) = dom::window() {
            let _ = window.alert_with_message(PROVIDER_MISSING_MESSAGE);
        }
    }

    fn connected(&self, address: &WalletAddress) {
        gloo_console::log!(format!("wallet connected: {}", address));
        if let Err(err) = dispatch_connected(address) {
            gloo_console::warn!(format!("failed to dispatch {}: {}", WALLET_CONNECTED_EVENT, dom::describe(&err)));
        }
    }
}

fn dispatch_connected(address: &WalletAddress) -> Result<(), JsValue> {
    let window = dom::window().map_err(|err| JsValue::from_str(&err))?;
    let detail = Object::new();
    Reflect::set(&detail, &JsValue::from_str("address"), &JsValue::from_str(address.as_str()))?;

    let init = CustomEventInit::new();
    init.set_detail(&detail);
    let event = CustomEvent::new_with_event_init_dict(WALLET_CONNECTED_EVENT, &init)?;
    window.dispatch_event(&event)?;
    Ok(())
}

/// `{signer, address}` for the first account, where `signer` is the
/// extension's own offline signer object. `null` when connecting fails.
pub async fn connect_wallet() -> JsValue {
    let connector = connector();
    let Some(account) = connector.connect().await else {
        return JsValue::NULL;
    };
    match connected_account(connector.chain_id(), &account.address) {
        Ok(result) => result,
        Err(err) => {
            gloo_console::error!(format!("failed to read offline signer: {}", err));
            JsValue::NULL
        }
    }
}

fn connected_account(chain_id: &ChainId, address: &WalletAddress) -> Result<JsValue, WalletError> {
    let signer = call(&keplr()?, "getOfflineSigner", &[JsValue::from_str(chain_id.as_str())])?;
    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("signer"), &signer).map_err(provider_error)?;
    Reflect::set(&result, &JsValue::from_str("address"), &JsValue::from_str(address.as_str()))
        .map_err(provider_error)?;
    Ok(result.into())
}

pub fn connector() -> WalletConnector {
    let provider: Option<Arc<dyn WalletProvider>> = if is_installed() {
        Some(Arc::new(KeplrProvider))
    } else {
        None
    };
    let chain_id = dom::global_string("YN_CHAIN_ID").map(ChainId).unwrap_or_else(ChainId::secret);
    WalletConnector::new(provider, Arc::new(AlertNotifier), chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const FAKE_EXTENSION: &str = r#"
        window.ynConnectedEvents = [];
        window.addEventListener("keplr-wallet-connected", (event) => {
            window.ynConnectedEvents.push(event.detail.address);
        });
        window.keplr = {
            enable: async () => undefined,
            getOfflineSigner: (chainId) => ({
                chainId,
                getAccounts: async () => [
                    { address: "secret1first", algo: "secp256k1", pubkey: new Uint8Array(33) },
                    { address: "secret1second", algo: "secp256k1", pubkey: new Uint8Array(33) },
                ],
            }),
        };
    "#;

    fn field(object: &JsValue, name: &str) -> JsValue {
        Reflect::get(object, &JsValue::from_str(name)).unwrap()
    }

    #[wasm_bindgen_test]
    async fn connect_announces_address_and_returns_signer() {
        js_sys::eval(FAKE_EXTENSION).unwrap();

        let result = connect_wallet().await;
        assert_eq!(field(&result, "address").as_string().as_deref(), Some("secret1first"));
        let signer = field(&result, "signer");
        assert_eq!(field(&signer, "chainId").as_string().as_deref(), Some("secret-4"));

        let events: Array = field(&js_sys::global(), "ynConnectedEvents").dyn_into().unwrap();
        assert_eq!(events.length(), 1);
        assert_eq!(events.get(0).as_string().as_deref(), Some("secret1first"));
    }
}
