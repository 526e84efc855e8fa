//! Synthetic firmware feature trees for integration tests.

#![allow(dead_code)]

use serde_json::json;
use std::path::{Path, PathBuf};

/// Content knobs for a generated firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// The reference router image
    Router,
    /// A close relative of the router image
    RouterRevision,
    /// An unrelated camera image
    Camera,
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Write every artifact all five modules read under `<data_dir>/<name>`.
pub fn write_firmware(data_dir: &Path, name: &str, flavor: Flavor) -> PathBuf {
    let root = data_dir.join(name);
    let out = root.join("output_json").join(name);

    let (signatures, interfaces, params, symbols, web_strings) = match flavor {
        Flavor::Router => (
            vec!["uImage header", "LZMA compressed data", "Squashfs filesystem", "JFFS2 filesystem"],
            "/cgi-bin/login.cgi\n/cgi-bin/upgrade.cgi\n/goform/setWan\n/HNAP1/\n",
            "username\npassword\nwan_ip\nfirmware\n",
            "httpd_main\nparse_request\nnvram_get\nsystem\n",
            "login failed\nadmin password\nfirmware upgrade\n",
        ),
        Flavor::RouterRevision => (
            vec!["uImage header", "LZMA compressed data", "Squashfs filesystem", "CPIO archive"],
            "/cgi-bin/login.cgi\n/cgi-bin/upgrade.cgi\n/goform/setWan\n/goform/setLan\n",
            "username\npassword\nwan_ip\nlan_ip\n",
            "httpd_main\nparse_request\nnvram_get\npopen\n",
            "login failed\nadmin password\nfirmware update\n",
        ),
        Flavor::Camera => (
            vec!["TRX firmware header", "gzip compressed data", "CramFS filesystem", "ELF executable"],
            "/onvif/device_service\n/snapshot.jpg\n/rtsp/stream1\n",
            "channel\nresolution\nbitrate\n",
            "rtsp_server\nencode_frame\nv4l2_open\n",
            "stream started\nmotion detected\n",
        ),
    };

    write(
        &root.join("binwalk_docker_result/binwalk_log").join(format!("{name}.json")),
        &json!({ "VECTOR": [signatures] }).to_string(),
    );

    write(&out.join("API_simple.result"), interfaces);
    write(&out.join("Prar_simple.result"), params);

    let (binary, chain) = if flavor == Flavor::Camera {
        ("rtspd", "rtsp_server -> 0x4010 -> encode_frame >> sprintf")
    } else {
        ("httpd", "httpd_main -> 0x4010 -> websGetVar >> strcpy")
    };
    let chains: Vec<String> = params
        .lines()
        .take(2)
        .map(|param| format!("Param \"{param}\" Referenced at {chain}"))
        .collect();
    let mut links = serde_json::Map::new();
    links.insert(binary.to_string(), json!(chains));
    write(&out.join("param_link.json"), &serde_json::Value::Object(links).to_string());

    write(&out.join("exports.txt"), symbols);
    write(&out.join("imports.txt"), "malloc\nfree\nstrcpy\n");
    write(&out.join("symbol_name.txt"), symbols);
    write(&out.join("func_name.txt"), symbols);

    write(
        &out.join("output.json"),
        &json!({
            "directory_structure_info": ["/bin", "/etc", "/www", "/lib"],
            "file_set": interfaces.lines().collect::<Vec<_>>(),
            "architecture": if flavor == Flavor::Camera { "arm" } else { "mips" },
            "filesystem": "squashfs",
            "operating_system": "linux",
            "urls": ["http://update.vendor.example"],
            "bin_file_info": symbols.lines().collect::<Vec<_>>(),
        })
        .to_string(),
    );
    write(&out.join("string_name.txt"), web_strings);
    write(
        &out.join(format!("{name}_all_strings")).join("www_index_strings.txt"),
        web_strings,
    );

    root
}
