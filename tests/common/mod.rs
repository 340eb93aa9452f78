#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const SOLUTION: &str = "\r\n\
Microsoft Visual Studio Solution File, Format Version 12.00\r\n\
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"App\", \"App\\App.csproj\", \"{5A1C2B6E-0000-0000-0000-000000000001}\"\r\n\
EndProject\r\n\
Project(\"{2150E333-8FDC-42A3-9474-1A3956D46DE8}\") = \".nuget\", \".nuget\", \"{5A1C2B6E-0000-0000-0000-000000000002}\"\r\n\
\tProjectSection(SolutionItems) = preProject\r\n\
\t\t.nuget\\NuGet.Config = .nuget\\NuGet.Config\r\n\
\t\t.nuget\\NuGet.exe = .nuget\\NuGet.exe\r\n\
\t\t.nuget\\NuGet.targets = .nuget\\NuGet.targets\r\n\
\tEndProjectSection\r\n\
EndProject\r\n\
Global\r\n\
EndGlobal\r\n";

pub const SOLUTION_CLEAN: &str = "\r\n\
Microsoft Visual Studio Solution File, Format Version 12.00\r\n\
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"App\", \"App\\App.csproj\", \"{5A1C2B6E-0000-0000-0000-000000000001}\"\r\n\
EndProject\r\n\
Global\r\n\
EndGlobal\r\n";

pub const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="12.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <SolutionDir Condition="$(SolutionDir) == ''">..\</SolutionDir>
    <RestorePackages>true</RestorePackages>
  </PropertyGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
  <Import Project="$(SolutionDir)\.nuget\NuGet.targets" Condition="Exists('$(SolutionDir)\.nuget\NuGet.targets')" />
  <Target Name="EnsureNuGetPackageBuildImports" BeforeTargets="PrepareForBuild">
    <Error Condition="!Exists('$(SolutionDir)\.nuget\NuGet.targets')" Text="Missing NuGet.targets" />
  </Target>
</Project>
"#;

pub const PROJECT_CLEAN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="12.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <SolutionDir Condition="$(SolutionDir) == ''">..\</SolutionDir>
    <RestorePackages>true</RestorePackages>
  </PropertyGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
</Project>
"#;

/// A solution still wired to solution-level package restore.
pub fn setup_legacy_solution() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join(".nuget")).unwrap();
    fs::write(root.join(".nuget/NuGet.Config"), "<configuration />").unwrap();
    fs::write(root.join(".nuget/NuGet.exe"), "MZ").unwrap();
    fs::write(root.join(".nuget/NuGet.targets"), "<Project />").unwrap();

    fs::create_dir_all(root.join("App")).unwrap();
    fs::write(root.join("App/App.csproj"), PROJECT).unwrap();
    fs::write(root.join("App/Program.cs"), "class Program {}").unwrap();
    fs::write(root.join("App/packages.config"), "<packages />").unwrap();

    fs::write(root.join("App.sln"), SOLUTION).unwrap();

    dir
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
