//! a habe console application.
//!
//! Operates on the JSON key files of the surrounding platform: global
//! parameters, per-authority key pairs, per-user key bundles and
//! ciphertext bundles all live as plain files in the working directory.

// clap 2.34's `crate_authors!` macro expands to code that trips the
// deny-by-default `dangerous_implicit_autorefs` lint on recent compilers.
// The pattern lives inside the macro, not our logic; allow it here.
#![allow(dangerous_implicit_autorefs)]

#[macro_use]
extern crate clap;

use clap::{App, Arg, ArgMatches, SubCommand};
use habe::{
    error::HabeError,
    schemes::hybrid::{
        authgen,
        decrypt,
        encrypt,
        keygen_multiple,
        setup,
        HybridAbeAuthorityPublicKey,
        HybridAbeAuthoritySecretKey,
        HybridAbeCiphertext,
        HybridAbeGlobalKey,
        HybridAbeUserKey,
        KeyWrapMode
    },
    utils::file::{read_json, read_to_vec, write_from_vec, write_json}
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

// File extensions and names
const CT_EXTENSION: &'static str = "ct";
const DOT: &'static str = ".";
const GP_FILE: &'static str = "gp.json";
const AU_PK_SUFFIX: &'static str = "_pk.json";
const AU_SK_SUFFIX: &'static str = "_sk.json";
const USER_PREFIX: &'static str = "user_";
const USER_SUFFIX: &'static str = "_keys.json";

// Argument names
const NAME: &'static str = "n";
const GID: &'static str = "g";
const ATTRIBUTES: &'static str = "a";
const POLICY: &'static str = "p";
const FILE: &'static str = "f";
const CONJUNCTIVE: &'static str = "c";

// Application commands
const CMD_SETUP: &'static str = "setup";
const CMD_AUTHGEN: &'static str = "authgen";
const CMD_KEYGEN: &'static str = "keygen";
const CMD_ENCRYPT: &'static str = "encrypt";
const CMD_DECRYPT: &'static str = "decrypt";

fn main() {
    let app = App::new("habe")
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about("hybrid policy-gated ABE in Rust")
        .subcommand(
            SubCommand::with_name(CMD_SETUP)
                .about("sets up the global parameters (gp.json)")
        )
        .subcommand(
            SubCommand::with_name(CMD_AUTHGEN)
                .about("creates a new attribute authority")
                .arg(
                    Arg::with_name(NAME)
                        .long("name")
                        .required(true)
                        .takes_value(true)
                        .help("name of the authority")
                )
        )
        .subcommand(
            SubCommand::with_name(CMD_KEYGEN)
                .about("issues attribute keys to a user")
                .arg(
                    Arg::with_name(NAME)
                        .long("name")
                        .required(true)
                        .takes_value(true)
                        .help("name of the issuing authority")
                )
                .arg(
                    Arg::with_name(GID)
                        .long("gid")
                        .required(true)
                        .takes_value(true)
                        .help("global identifier of the user")
                )
                .arg(
                    Arg::with_name(ATTRIBUTES)
                        .long("attributes")
                        .required(true)
                        .takes_value(true)
                        .multiple(true)
                        .help("attribute names, without the @authority part")
                )
        )
        .subcommand(
            SubCommand::with_name(CMD_ENCRYPT)
                .about("encrypts a file under an access policy")
                .arg(
                    Arg::with_name(FILE)
                        .long("file")
                        .required(true)
                        .takes_value(true)
                        .help("file to encrypt")
                )
                .arg(
                    Arg::with_name(POLICY)
                        .long("policy")
                        .required(true)
                        .takes_value(true)
                        .help("access policy, e.g. 'Doctor@Hospital AND Researcher@University'")
                )
                .arg(
                    Arg::with_name(CONJUNCTIVE)
                        .long("conjunctive")
                        .takes_value(false)
                        .help("wrap the data key per DNF term instead of per attribute")
                )
        )
        .subcommand(
            SubCommand::with_name(CMD_DECRYPT)
                .about("decrypts a ciphertext file with a user's keys")
                .arg(
                    Arg::with_name(FILE)
                        .long("file")
                        .required(true)
                        .takes_value(true)
                        .help("ciphertext file to decrypt")
                )
                .arg(
                    Arg::with_name(GID)
                        .long("gid")
                        .required(true)
                        .takes_value(true)
                        .help("global identifier of the user")
                )
        );
    let matches = app.get_matches();
    if let Err(e) = run(&matches) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), HabeError> {
    match matches.subcommand() {
        (CMD_SETUP, Some(_)) => run_setup(),
        (CMD_AUTHGEN, Some(arguments)) => run_authgen(arguments),
        (CMD_KEYGEN, Some(arguments)) => run_keygen(arguments),
        (CMD_ENCRYPT, Some(arguments)) => run_encrypt(arguments),
        (CMD_DECRYPT, Some(arguments)) => run_decrypt(arguments),
        _ => {
            eprintln!("please use a subcommand, see --help");
            process::exit(1);
        }
    }
}

fn run_setup() -> Result<(), HabeError> {
    if Path::new(GP_FILE).exists() {
        println!("global parameters already exist in {}", GP_FILE);
        return Ok(());
    }
    let gk = setup();
    write_json(Path::new(GP_FILE), &gk)?;
    println!("wrote global parameters to {}", GP_FILE);
    Ok(())
}

fn run_authgen(arguments: &ArgMatches) -> Result<(), HabeError> {
    let name = arguments.value_of(NAME).unwrap().to_string();
    let (public, secret) = authgen(&name);
    let pk_file = format!("{}{}", name, AU_PK_SUFFIX);
    let sk_file = format!("{}{}", name, AU_SK_SUFFIX);
    if Path::new(&sk_file).exists() {
        println!("warning: rotating authority {}, previously issued keys are now invalid", name);
    }
    write_json(Path::new(&pk_file), &public)?;
    write_json(Path::new(&sk_file), &secret)?;
    println!("wrote authority key pair to {} and {}", pk_file, sk_file);
    Ok(())
}

fn run_keygen(arguments: &ArgMatches) -> Result<(), HabeError> {
    let gk: HybridAbeGlobalKey = read_json(Path::new(GP_FILE))?;
    let name = arguments.value_of(NAME).unwrap().to_string();
    let gid = arguments.value_of(GID).unwrap().to_string();
    let secret: HybridAbeAuthoritySecretKey =
        read_json(Path::new(&format!("{}{}", name, AU_SK_SUFFIX)))?;
    // attributes are given bare and qualified with the issuing authority
    let attributes: Vec<String> = arguments
        .values_of(ATTRIBUTES)
        .unwrap()
        .map(|attribute| format!("{}@{}", attribute, name))
        .collect();
    let keys = keygen_multiple(&gk, &secret, &gid, &attributes)?;
    let user_file = format!("{}{}{}", USER_PREFIX, gid, USER_SUFFIX);
    let mut sk = if Path::new(&user_file).exists() {
        read_json(Path::new(&user_file))?
    } else {
        HybridAbeUserKey::new(gid.clone())
    };
    sk.extend(keys);
    write_json(Path::new(&user_file), &sk)?;
    println!("issued {} attribute key(s) to {}", attributes.len(), user_file);
    Ok(())
}

fn run_encrypt(arguments: &ArgMatches) -> Result<(), HabeError> {
    let gk: HybridAbeGlobalKey = read_json(Path::new(GP_FILE))?;
    let file = arguments.value_of(FILE).unwrap();
    let policy = arguments.value_of(POLICY).unwrap().to_string();
    let mode = if arguments.is_present(CONJUNCTIVE) {
        KeyWrapMode::PerConjunction
    } else {
        KeyWrapMode::PerAttribute
    };
    let pks = collect_authority_pks()?;
    let plaintext = read_to_vec(Path::new(file))?;
    let ct = encrypt(&gk, &pks, &policy, &plaintext, mode)?;
    let ct_file = format!("{}{}{}", file, DOT, CT_EXTENSION);
    write_json(Path::new(&ct_file), &ct)?;
    println!("wrote ciphertext to {}", ct_file);
    Ok(())
}

fn run_decrypt(arguments: &ArgMatches) -> Result<(), HabeError> {
    let gk: HybridAbeGlobalKey = read_json(Path::new(GP_FILE))?;
    let file = arguments.value_of(FILE).unwrap();
    let gid = arguments.value_of(GID).unwrap();
    let sk: HybridAbeUserKey =
        read_json(Path::new(&format!("{}{}{}", USER_PREFIX, gid, USER_SUFFIX)))?;
    let ct: HybridAbeCiphertext = read_json(Path::new(file))?;
    // authority secrets are loaded transiently for this one decryption
    let mut store: BTreeMap<String, HybridAbeAuthoritySecretKey> = BTreeMap::new();
    for key in sk.keys.values() {
        if !store.contains_key(&key.authority) {
            let secret: HybridAbeAuthoritySecretKey =
                read_json(Path::new(&format!("{}{}", key.authority, AU_SK_SUFFIX)))?;
            store.insert(key.authority.clone(), secret);
        }
    }
    let plaintext = decrypt(&gk, &sk, &store, &ct)?;
    let out_file = strip_ct_extension(file);
    write_from_vec(&out_file, &plaintext)?;
    println!("wrote plaintext to {}", out_file.display());
    Ok(())
}

fn collect_authority_pks() -> Result<Vec<HybridAbeAuthorityPublicKey>, HabeError> {
    let mut pks = Vec::new();
    for entry in std::fs::read_dir(DOT)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.ends_with(AU_PK_SUFFIX) {
            pks.push(read_json(&entry.path())?);
        }
    }
    Ok(pks)
}

fn strip_ct_extension(file: &str) -> PathBuf {
    let suffix = format!("{}{}", DOT, CT_EXTENSION);
    match file.strip_suffix(&suffix) {
        Some(stripped) => PathBuf::from(format!("{}.plain", stripped)),
        None => PathBuf::from(format!("{}.plain", file)),
    }
}
