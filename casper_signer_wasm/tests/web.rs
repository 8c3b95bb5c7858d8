#![cfg(target_arch = "wasm32")]

use casper_signer_wasm::SignerExtension;
use js_sys::{Function, Promise};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn extension() -> SignerExtension {
    SignerExtension::new(
        Function::new_with_args("kind", ""),
        Function::new_no_args(""),
        Function::new_with_args("json", ""),
    )
}

fn transfer_deploy(account_hex: &str) -> String {
    format!(
        r#"{{"deploy":{{"hash":"{hash}","header":{{"account":"{account}","timestamp":"2021-05-04T15:30:05.123Z","ttl":"30m","gas_price":1,"body_hash":"{hash}","dependencies":[],"chain_name":"casper-test"}},"payment":{{"ModuleBytes":{{"module_bytes":"","args":[["amount",{{"cl_type":"U512","bytes":"0400e1f505","parsed":"100000000"}}]]}}}},"session":{{"Transfer":{{"args":[]}}}},"approvals":[]}}}}"#,
        hash = "ab".repeat(32),
        account = account_hex
    )
}

async fn next_pending(ext: &SignerExtension) -> f64 {
    loop {
        if let Some(id) = ext.next_pending_id() {
            return id;
        }
        JsFuture::from(Promise::resolve(&JsValue::NULL)).await.unwrap();
    }
}

#[wasm_bindgen_test]
fn active_key_needs_connection() {
    let ext = extension();
    let account_hex = ext.add_account("main", "ed25519", &"aa".repeat(32)).unwrap();
    assert!(ext.get_active_public_key().is_err());
    ext.approve_connection();
    assert_eq!(ext.get_active_public_key().unwrap(), account_hex);
    assert!(ext.add_account("bad", "rsa", &"aa".repeat(32)).is_err());
}

#[wasm_bindgen_test]
async fn approve_resolves_the_sign_promise() {
    let ext = extension();
    let account_hex = ext.add_account("main", "ed25519", &"aa".repeat(32)).unwrap();
    ext.approve_connection();

    let promise = ext.sign(transfer_deploy(&account_hex), None);
    let id = next_pending(&ext).await;
    assert!(ext.parse_deploy_data(id).unwrap().contains("\"deployType\":\"Transfer\""));
    ext.approve(id).unwrap();

    let signed = JsFuture::from(promise).await.unwrap().as_string().unwrap();
    assert!(signed.contains(&account_hex));
}

#[wasm_bindgen_test]
async fn reject_fails_the_sign_promise() {
    let ext = extension();
    let account_hex = ext.add_account("main", "ed25519", &"aa".repeat(32)).unwrap();
    ext.approve_connection();

    let promise = ext.sign(transfer_deploy(&account_hex), Some(account_hex.clone()));
    let id = next_pending(&ext).await;
    ext.reject(id).unwrap();

    let err = JsFuture::from(promise).await.unwrap_err();
    assert_eq!(err.as_string().unwrap(), "User Cancelled Signing");
    assert!(ext.reject(id).is_err());
}

#[wasm_bindgen_test]
async fn queue_handler_may_reject_from_inside_the_update() {
    let slot: Rc<RefCell<Option<SignerExtension>>> = Rc::new(RefCell::new(None));
    let handler_slot = slot.clone();
    let on_update = Closure::wrap(Box::new(move |_json: JsValue| {
        if let Some(ext) = handler_slot.borrow().as_ref() {
            if let Some(id) = ext.next_pending_id() {
                ext.reject(id).unwrap();
            }
        }
    }) as Box<dyn FnMut(JsValue)>);

    let ext = SignerExtension::new(
        Function::new_with_args("kind", ""),
        Function::new_no_args(""),
        on_update.as_ref().unchecked_ref::<Function>().clone(),
    );
    on_update.forget();
    let account_hex = ext.add_account("main", "ed25519", &"aa".repeat(32)).unwrap();
    ext.approve_connection();
    let promise = ext.sign(transfer_deploy(&account_hex), None);
    *slot.borrow_mut() = Some(ext);

    let err = JsFuture::from(promise).await.unwrap_err();
    assert_eq!(err.as_string().unwrap(), "User Cancelled Signing");
}
