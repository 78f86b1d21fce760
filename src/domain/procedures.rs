/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Command lists for the disk and LVM lifecycles
//!
//! Every builder is a pure function of its layout. The order of the returned
//! commands is part of the contract: devices are created before use, unmounted
//! before removal, logical volumes go before the volume group, the volume group
//! before the physical volume, and the loop device is detached last.

use super::parsers::shell_quote;
use crate::domain::{CommandList, DiskLayout, LvmLayout};
use std::path::Path;

const DISK_MARKER: &str = "Hello ext4";
const LOGICAL_VOLUMES: [(&str, &str); 2] = [("testlv1", "50%FREE"), ("testlv2", "100%FREE")];

fn quoted(path: &Path) -> String {
    shell_quote(&path.display().to_string()).into_owned()
}

/// Device-mapper node of a logical volume; hyphens in names are doubled
fn mapper_path(volume_group: &str, logical_volume: &str) -> String {
    format!(
        "/dev/mapper/{}-{}",
        volume_group.replace('-', "--"),
        logical_volume.replace('-', "--")
    )
}

fn write_marker(marker: &str, file: &Path) -> String {
    format!("printf '{marker}\\n' | sudo tee {} > /dev/null", quoted(file))
}

fn verify_marker(marker: &str, file: &Path) -> String {
    format!("grep -qx '{marker}' {}", quoted(file))
}

/// Best-effort removal of anything a previous disk run left behind
pub fn disk_cleanup_commands(layout: &DiskLayout) -> CommandList {
    let mount_point = quoted(&layout.mount_point);
    let work_dir = quoted(&layout.work_dir);

    [
        format!("sudo umount {mount_point} 2>/dev/null || true"),
        format!("sudo rm -rf {mount_point} {work_dir} 2>/dev/null || true"),
    ]
    .into_iter()
    .collect()
}

/// Create, mount, write, verify and tear down a loop-mounted ext4 image
pub fn disk_procedure_commands(layout: &DiskLayout) -> CommandList {
    let work_dir = quoted(&layout.work_dir);
    let image = quoted(&layout.image);
    let mount_point = quoted(&layout.mount_point);
    let marker_file = layout.mount_point.join("test.txt");

    [
        format!("mkdir -p {work_dir}"),
        format!("fallocate -l {} {image}", layout.image_size),
        format!("mkfs.ext4 -F {image}"),
        format!("sudo mkdir -p {mount_point}"),
        format!("sudo mount -o loop {image} {mount_point}"),
        write_marker(DISK_MARKER, &marker_file),
        verify_marker(DISK_MARKER, &marker_file),
        format!("sudo umount {mount_point}"),
        format!("wipefs -a {image}"),
        format!("rm -f {image}"),
        format!("sudo rm -rf {mount_point}"),
        format!("rm -rf {work_dir}"),
    ]
    .into_iter()
    .collect()
}

/// Best-effort removal of anything a previous LVM run left behind
pub fn lvm_cleanup_commands(layout: &LvmLayout) -> CommandList {
    let vg = &layout.volume_group;
    let loop_device = &layout.loop_device;
    let [mount1, mount2] = &layout.mount_points;
    let (mount1, mount2) = (quoted(mount1), quoted(mount2));
    let work_dir = quoted(&layout.work_dir);

    [
        format!("sudo umount {mount1} {mount2} 2>/dev/null || true"),
        format!(
            "sudo lvremove -y {vg}/{} {vg}/{} 2>/dev/null || true",
            LOGICAL_VOLUMES[0].0, LOGICAL_VOLUMES[1].0
        ),
        format!("sudo vgremove -y {vg} 2>/dev/null || true"),
        format!("sudo rm -rf /dev/{vg} 2>/dev/null || true"),
        format!("sudo pvremove -y {loop_device} 2>/dev/null || true"),
        format!("sudo losetup -d {loop_device} 2>/dev/null || true"),
        format!("sudo rm -rf {mount1} {mount2} {work_dir} 2>/dev/null || true"),
    ]
    .into_iter()
    .collect()
}

/// Build a volume group with two logical volumes on a loop device, format,
/// mount, write, verify and tear everything down again
pub fn lvm_procedure_commands(layout: &LvmLayout) -> CommandList {
    let vg = &layout.volume_group;
    let loop_device = &layout.loop_device;
    let work_dir = quoted(&layout.work_dir);
    let image = quoted(&layout.image);
    let [mount1, mount2] = &layout.mount_points;
    let mounts = format!("{} {}", quoted(mount1), quoted(mount2));

    let mut commands = CommandList::new();
    commands.push(format!("mkdir -p {work_dir}"));
    commands.push(format!("fallocate -l {} {image}", layout.image_size));
    commands.push(format!("sudo losetup {loop_device} {image}"));
    commands.push(format!("sudo pvcreate -y {loop_device}"));
    commands.push(format!("sudo vgcreate {vg} {loop_device}"));
    for (lv, extent) in LOGICAL_VOLUMES {
        commands.push(format!("sudo lvcreate -Z n -l {extent} -n {lv} {vg}"));
    }
    commands.push(format!("sudo vgchange -ay {vg}"));
    commands.push("sudo vgscan --mknodes");
    for (lv, _) in LOGICAL_VOLUMES {
        commands.push(format!("sudo mkfs.ext4 -F {}", mapper_path(vg, lv)));
    }
    commands.push(format!("sudo mkdir -p {mounts}"));
    for ((lv, _), mount_point) in LOGICAL_VOLUMES.iter().zip(&layout.mount_points) {
        commands.push(format!(
            "sudo mount {} {}",
            mapper_path(vg, lv),
            quoted(mount_point)
        ));
    }
    for (index, mount_point) in layout.mount_points.iter().enumerate() {
        let marker = format!("Hello LVM LV{}", index + 1);
        commands.push(write_marker(&marker, &mount_point.join("test.txt")));
    }
    for (index, mount_point) in layout.mount_points.iter().enumerate() {
        let marker = format!("Hello LVM LV{}", index + 1);
        commands.push(verify_marker(&marker, &mount_point.join("test.txt")));
    }
    commands.push(format!("sudo umount {mounts}"));
    commands.push(format!(
        "sudo lvremove -y {vg}/{} {vg}/{}",
        LOGICAL_VOLUMES[0].0, LOGICAL_VOLUMES[1].0
    ));
    commands.push(format!("sudo vgremove -y {vg}"));
    commands.push(format!("sudo pvremove -y {loop_device}"));
    commands.push(format!("sudo losetup -d {loop_device}"));
    commands.push(format!("rm -f {image}"));
    commands.push(format!("sudo rm -rf {mounts} {work_dir}"));
    commands
}
